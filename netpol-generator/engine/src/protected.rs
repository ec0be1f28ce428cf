/// Namespaces whose deployments never receive a generated policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectedNamespaces {
    platform: String,
}

const SYSTEM_NAMESPACES: &[&str] = &["kube-system", "kube-public", "kube-node-lease", "openshift"];

const OPENSHIFT_PREFIX: &str = "openshift-";

// === impl ProtectedNamespaces ===

impl Default for ProtectedNamespaces {
    fn default() -> Self {
        Self::new("stackrox")
    }
}

impl ProtectedNamespaces {
    /// `platform` is the namespace the platform itself runs in.
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
        }
    }

    pub fn is_protected(&self, namespace: &str) -> bool {
        namespace == self.platform
            || SYSTEM_NAMESPACES.contains(&namespace)
            || namespace.starts_with(OPENSHIFT_PREFIX)
    }
}
