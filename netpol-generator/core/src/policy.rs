use crate::{
    labels::{Map, Selector},
    GENERATED_LABEL,
};
use serde::{Deserialize, Serialize};

/// A Kubernetes `networking.k8s.io/v1` network policy, either existing in the
/// cluster or produced by the generator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicy {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub labels: Map,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub spec: NetworkPolicySpec,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicySpec {
    #[serde(default)]
    pub pod_selector: Selector,
    #[serde(default)]
    pub policy_types: Vec<PolicyType>,
    #[serde(default)]
    pub ingress: Vec<IngressRule>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PolicyType {
    Ingress,
    Egress,
}

/// A single ingress rule.
///
/// `from: None` admits no source at all, while `from: Some(vec![])` admits
/// every source. The two are never interchangeable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngressRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<NetworkPolicyPeer>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicyPeer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_selector: Option<Selector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<Selector>,
}

/// Names a policy that should be deleted.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct NetworkPolicyReference {
    pub name: String,
    pub namespace: String,
}

// === impl NetworkPolicy ===

impl NetworkPolicy {
    /// Indicates whether this policy was created by the generator.
    pub fn is_generated(&self) -> bool {
        self.labels.contains_key(GENERATED_LABEL)
    }

    pub fn reference(&self) -> NetworkPolicyReference {
        NetworkPolicyReference {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
        }
    }

    pub fn affects_ingress(&self) -> bool {
        self.spec.policy_types.contains(&PolicyType::Ingress)
    }

    pub fn affects_egress(&self) -> bool {
        self.spec.policy_types.contains(&PolicyType::Egress)
    }
}

// === impl IngressRule ===

impl IngressRule {
    /// A rule admitting no source.
    pub fn deny_all() -> Self {
        Self { from: None }
    }

    /// A rule admitting every source, including those outside the cluster.
    ///
    /// Each call returns a new value; callers may mutate it freely.
    pub fn allow_all() -> Self {
        Self {
            from: Some(Vec::new()),
        }
    }

    /// A rule admitting every pod in every namespace, but nothing from outside
    /// the cluster.
    pub fn allow_all_pods_all_namespaces() -> Self {
        Self {
            from: Some(vec![NetworkPolicyPeer {
                pod_selector: Some(Selector::default()),
                namespace_selector: Some(Selector::default()),
            }]),
        }
    }

    pub fn from_peers(peers: impl IntoIterator<Item = NetworkPolicyPeer>) -> Self {
        Self {
            from: Some(peers.into_iter().collect()),
        }
    }

    pub fn is_deny_all(&self) -> bool {
        self.from.is_none()
    }
}
