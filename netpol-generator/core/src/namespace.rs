use crate::labels::{Map, Selector};
use serde::{Deserialize, Serialize};

/// Label keys that carry a namespace's name, in order of preference.
pub const NAMESPACE_NAME_LABELS: [&str; 2] = [
    "namespace.metadata.stackrox.io/name",
    "kubernetes.io/metadata.name",
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub labels: Map,
}

// === impl NamespaceMetadata ===

impl NamespaceMetadata {
    /// Returns the first recognized namespace-name label on this namespace.
    pub fn name_label(&self) -> Option<(&'static str, &str)> {
        NAMESPACE_NAME_LABELS.iter().find_map(|key| {
            self.labels
                .get(*key)
                .map(|value| (*key, value.as_str()))
        })
    }

    /// Builds a selector matching this namespace.
    ///
    /// The selector matches the namespace's name under the canonical name
    /// label when one is set, and every label of the namespace otherwise.
    pub fn selector(&self) -> Selector {
        match self.name_label() {
            Some((key, _)) => Selector::from_iter(Some((key.to_string(), self.name.clone()))),
            None => Selector::from_map(self.labels.clone()),
        }
    }
}
