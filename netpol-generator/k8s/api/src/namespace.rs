use crate::{Cluster, Namespace, ResourceExt};
use netpol_generator_core::NamespaceMetadata;

/// Describes a Kubernetes namespace. The namespace's UID is its ID; namespaces
/// read from manifests without a UID are identified by name.
pub fn from_k8s(ns: &Namespace, cluster: &Cluster) -> NamespaceMetadata {
    let name = ns.name_any();
    NamespaceMetadata {
        id: ns.uid().unwrap_or_else(|| name.clone()),
        name,
        cluster_id: cluster.id.clone(),
        cluster_name: cluster.name.clone(),
        labels: ns.labels().clone(),
    }
}
