//! Collaborators that supply the inputs of a generation pass.
//!
//! Implementations are expected to have already applied the caller's
//! visibility: deployments and namespaces the caller may not see are simply
//! absent from their results.

use crate::{Deployment, NamespaceMetadata, NetworkBaseline, NetworkFlow, NetworkPolicy, Query};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Resolves the flow store of a cluster.
pub trait FlowAccessor: Send + Sync {
    fn flow_store_for_cluster(&self, cluster_id: &str) -> Option<Arc<dyn FlowStore>>;
}

#[async_trait::async_trait]
pub trait FlowStore: Send + Sync {
    /// Returns every flow seen since `since`, along with the time as of which
    /// the result is current.
    async fn all_flows(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<(Vec<NetworkFlow>, DateTime<Utc>)>;
}

#[async_trait::async_trait]
pub trait DeploymentAccessor: Send + Sync {
    async fn search_raw_deployments(&self, query: &Query) -> Result<Vec<Deployment>>;

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>>;
}

#[async_trait::async_trait]
pub trait NamespaceAccessor: Send + Sync {
    async fn search_namespaces(&self, query: &Query) -> Result<Vec<NamespaceMetadata>>;
}

#[async_trait::async_trait]
pub trait PolicyAccessor: Send + Sync {
    /// Returns the cluster's network policies, optionally limited to a single
    /// namespace.
    async fn network_policies(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<NetworkPolicy>>;
}

/// Looks up the network baselines of deployments.
#[async_trait::async_trait]
pub trait BaselineAccessor: Send + Sync {
    /// Returns `None` if the deployment has no baseline.
    async fn network_baseline(&self, deployment_id: &str) -> Result<Option<NetworkBaseline>>;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SearchResult {
    pub id: String,
}
