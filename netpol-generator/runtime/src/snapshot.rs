//! Generator inputs read from a single document.
//!
//! A snapshot holds everything a generation pass consumes for one cluster.
//! [`SnapshotStore`] serves it through the collaborator traits, hiding the
//! deployments and namespaces outside the caller's [`Visibility`].

use crate::core::{
    store::{
        BaselineAccessor, DeploymentAccessor, FlowAccessor, FlowStore, NamespaceAccessor,
        PolicyAccessor, SearchResult,
    },
    Deployment, NamespaceMetadata, NetworkBaseline, NetworkFlow, NetworkPolicy, Query,
};
use ahash::AHashSet as HashSet;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc};
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub cluster_id: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
    #[serde(default)]
    pub namespaces: Vec<NamespaceMetadata>,
    #[serde(default)]
    pub network_policies: Vec<NetworkPolicy>,
    #[serde(default)]
    pub flows: Vec<NetworkFlow>,
    #[serde(default)]
    pub baselines: Vec<NetworkBaseline>,
}

/// The namespaces whose deployments and metadata the caller may see.
#[derive(Clone, Debug, Default)]
pub struct Visibility(Option<HashSet<String>>);

#[derive(Clone, Debug)]
pub struct SnapshotStore {
    snapshot: Arc<Snapshot>,
    visibility: Visibility,
}

/// Reads a YAML or JSON document.
pub(crate) fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

// === impl Snapshot ===

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let mut snapshot = load::<Self>(path)?;
        snapshot.fill_cluster();
        debug!(
            path = %path.display(),
            deployments = snapshot.deployments.len(),
            namespaces = snapshot.namespaces.len(),
            policies = snapshot.network_policies.len(),
            flows = snapshot.flows.len(),
            baselines = snapshot.baselines.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Attributes resources that don't name a cluster to the snapshot's
    /// cluster.
    pub fn fill_cluster(&mut self) {
        for d in &mut self.deployments {
            fill(&mut d.cluster_id, &self.cluster_id);
            fill(&mut d.cluster_name, &self.cluster_name);
        }
        for ns in &mut self.namespaces {
            fill(&mut ns.cluster_id, &self.cluster_id);
            fill(&mut ns.cluster_name, &self.cluster_name);
        }
        for p in &mut self.network_policies {
            fill(&mut p.cluster_id, &self.cluster_id);
            fill(&mut p.cluster_name, &self.cluster_name);
        }
        for b in &mut self.baselines {
            fill(&mut b.cluster_id, &self.cluster_id);
        }
    }
}

fn fill(field: &mut String, value: &str) {
    if field.is_empty() {
        *field = value.to_string();
    }
}

// === impl Visibility ===

impl Visibility {
    pub fn all() -> Self {
        Self(None)
    }

    pub fn namespaces(namespaces: impl IntoIterator<Item = String>) -> Self {
        Self(Some(namespaces.into_iter().collect()))
    }

    pub fn allows(&self, namespace: &str) -> bool {
        self.0.as_ref().map_or(true, |ns| ns.contains(namespace))
    }
}

// === impl SnapshotStore ===

impl SnapshotStore {
    pub fn new(snapshot: Snapshot, visibility: Visibility) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            visibility,
        }
    }

    fn visible_deployments<'q>(&'q self, query: &'q Query) -> impl Iterator<Item = &'q Deployment> {
        self.snapshot
            .deployments
            .iter()
            .filter(move |d| self.visibility.allows(&d.namespace))
            .filter(move |d| query.matches_deployment(d))
    }
}

impl FlowAccessor for SnapshotStore {
    fn flow_store_for_cluster(&self, cluster_id: &str) -> Option<Arc<dyn FlowStore>> {
        if cluster_id != self.snapshot.cluster_id {
            return None;
        }
        Some(Arc::new(self.clone()))
    }
}

/// Flows are never filtered by visibility: traffic to and from hidden
/// deployments is what makes them masked peers.
#[async_trait::async_trait]
impl FlowStore for SnapshotStore {
    async fn all_flows(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<(Vec<NetworkFlow>, DateTime<Utc>)> {
        let flows = self
            .snapshot
            .flows
            .iter()
            .filter(|f| f.seen_since(since))
            .cloned()
            .collect();
        Ok((flows, Utc::now()))
    }
}

#[async_trait::async_trait]
impl DeploymentAccessor for SnapshotStore {
    async fn search_raw_deployments(&self, query: &Query) -> Result<Vec<Deployment>> {
        Ok(self.visible_deployments(query).cloned().collect())
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>> {
        Ok(self
            .visible_deployments(query)
            .map(|d| SearchResult { id: d.id.clone() })
            .collect())
    }
}

#[async_trait::async_trait]
impl NamespaceAccessor for SnapshotStore {
    async fn search_namespaces(&self, query: &Query) -> Result<Vec<NamespaceMetadata>> {
        Ok(self
            .snapshot
            .namespaces
            .iter()
            .filter(|ns| self.visibility.allows(&ns.name))
            .filter(|ns| query.matches_namespace(ns))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl PolicyAccessor for SnapshotStore {
    async fn network_policies(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<NetworkPolicy>> {
        Ok(self
            .snapshot
            .network_policies
            .iter()
            .filter(|p| p.cluster_id == cluster_id)
            .filter(|p| namespace.map_or(true, |ns| p.namespace == ns))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl BaselineAccessor for SnapshotStore {
    async fn network_baseline(&self, deployment_id: &str) -> Result<Option<NetworkBaseline>> {
        Ok(self
            .snapshot
            .baselines
            .iter()
            .find(|b| b.deployment_id == deployment_id)
            .cloned())
    }
}
