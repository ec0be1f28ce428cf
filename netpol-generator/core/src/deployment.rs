use crate::{
    flow::L4Protocol,
    labels::{Map, Selector},
};
use serde::{Deserialize, Serialize};

/// A deployment as visible to the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub pod_labels: Map,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<Selector>,
    #[serde(default)]
    pub ports: Vec<PortConfig>,
    #[serde(default)]
    pub annotations: Map,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub container_port: u32,
    #[serde(default)]
    pub protocol: L4Protocol,
    #[serde(default)]
    pub exposure: Exposure,
}

/// How far a port is reachable, ordered from least to most exposed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Exposure {
    #[default]
    Unset,
    Internal,
    Node,
    External,
}

// === impl Deployment ===

impl Deployment {
    /// The selector for this deployment's pods: its declared label selector,
    /// or its pod labels when none is declared.
    pub fn selector(&self) -> Selector {
        match self.label_selector.as_ref() {
            Some(selector) => selector.clone(),
            None => Selector::from_map(self.pod_labels.clone()),
        }
    }

    /// Indicates whether any port is reachable from outside the cluster.
    pub fn is_externally_exposed(&self) -> bool {
        self.ports.iter().any(|p| p.exposure.is_external())
    }
}

// === impl Exposure ===

impl Exposure {
    pub fn is_external(self) -> bool {
        matches!(self, Self::Node | Self::External)
    }
}
