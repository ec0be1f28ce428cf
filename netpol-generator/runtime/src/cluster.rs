//! Reads generator inputs from a live cluster.
//!
//! Deployments, services, namespaces and network policies come from the
//! Kubernetes API. The API has no record of observed traffic, so flows are
//! supplied separately.

use crate::{
    core::NetworkFlow,
    k8s::{self, Cluster, ResourceExt},
    snapshot::{self, Snapshot},
};
use ahash::AHashMap as HashMap;
use anyhow::{Context, Result};
use kube::{
    api::{Api, ListParams},
    Client,
};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info, warn};

pub(crate) async fn snapshot(
    client: Client,
    cluster: Cluster,
    flows: Vec<NetworkFlow>,
) -> Result<Snapshot> {
    let deployments = list::<k8s::Deployment>(&client).await?;
    let services = list::<k8s::Service>(&client).await?;
    let namespaces = list::<k8s::Namespace>(&client).await?;
    let policies = list::<k8s::NetworkPolicy>(&client).await?;
    info!(
        cluster = %cluster.name,
        deployments = deployments.len(),
        services = services.len(),
        namespaces = namespaces.len(),
        policies = policies.len(),
        "Listed cluster resources"
    );
    Ok(from_resources(
        cluster,
        deployments,
        services,
        namespaces,
        policies,
        flows,
    ))
}

/// Reads a list of flows from a YAML or JSON document.
pub(crate) fn load_flows(path: &Path) -> Result<Vec<NetworkFlow>> {
    let flows = snapshot::load::<Vec<NetworkFlow>>(path)?;
    debug!(path = %path.display(), flows = flows.len(), "Loaded flows");
    Ok(flows)
}

async fn list<K>(client: &Client) -> Result<Vec<K>>
where
    K: kube::Resource + Clone + DeserializeOwned + std::fmt::Debug,
    K::DynamicType: Default,
{
    let kind = K::kind(&Default::default()).to_string();
    let list = Api::<K>::all(client.clone())
        .list(&ListParams::default())
        .await
        .with_context(|| format!("listing {kind} resources"))?;
    Ok(list.items)
}

/// Converts listed resources into a snapshot. Resources that cannot be
/// described are logged and left out.
fn from_resources(
    cluster: Cluster,
    deployments: Vec<k8s::Deployment>,
    services: Vec<k8s::Service>,
    namespaces: Vec<k8s::Namespace>,
    policies: Vec<k8s::NetworkPolicy>,
    flows: Vec<NetworkFlow>,
) -> Snapshot {
    let mut services_by_ns = HashMap::<String, Vec<k8s::Service>>::new();
    for svc in services {
        if let Some(ns) = svc.namespace() {
            services_by_ns.entry(ns).or_default().push(svc);
        }
    }

    let deployments = deployments
        .iter()
        .filter_map(|d| {
            let services = d
                .namespace()
                .and_then(|ns| services_by_ns.get(&ns))
                .map(Vec::as_slice)
                .unwrap_or_default();
            match k8s::deployment::from_k8s(d, services, &cluster) {
                Ok(d) => Some(d),
                Err(error) => {
                    warn!(%error, "Skipping deployment");
                    None
                }
            }
        })
        .collect();

    let network_policies = policies
        .iter()
        .filter_map(|np| match k8s::policy::from_k8s(np, &cluster) {
            Ok(p) => Some(p),
            Err(error) => {
                warn!(%error, "Skipping network policy");
                None
            }
        })
        .collect();

    let namespaces = namespaces
        .iter()
        .map(|ns| k8s::namespace::from_k8s(ns, &cluster))
        .collect();

    Snapshot {
        cluster_id: cluster.id,
        cluster_name: cluster.name,
        deployments,
        namespaces,
        network_policies,
        flows,
        baselines: Vec::new(),
    }
}
