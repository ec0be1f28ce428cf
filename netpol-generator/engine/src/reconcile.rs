//! Classifies existing policies into those a generation pass keeps and those it
//! deletes.

use ahash::AHashMap as HashMap;
use netpol_generator_core::{
    labels_match, DeleteExisting, Deployment, NetworkPolicy, NetworkPolicyReference,
};

/// Policies kept by a generation pass, indexed by namespace and by the traffic
/// direction they affect.
#[derive(Clone, Debug, Default)]
pub struct ExistingPolicies {
    ingress: HashMap<String, Vec<NetworkPolicy>>,
    egress: HashMap<String, Vec<NetworkPolicy>>,
}

/// Splits `existing` according to `mode`, returning the kept policies and
/// references to those that should be deleted.
pub fn reconcile(
    existing: Vec<NetworkPolicy>,
    mode: DeleteExisting,
) -> (Vec<NetworkPolicy>, Vec<NetworkPolicyReference>) {
    match mode {
        DeleteExisting::None => (existing, Vec::new()),
        DeleteExisting::GeneratedOnly => {
            let (generated, kept) = existing
                .into_iter()
                .partition::<Vec<_>, _>(NetworkPolicy::is_generated);
            let to_delete = generated.iter().map(NetworkPolicy::reference).collect();
            (kept, to_delete)
        }
        DeleteExisting::All => {
            let to_delete = existing.iter().map(NetworkPolicy::reference).collect();
            (Vec::new(), to_delete)
        }
    }
}

// === impl ExistingPolicies ===

impl ExistingPolicies {
    /// Returns a kept, user-authored ingress policy in the deployment's
    /// namespace that selects exactly the deployment's pod labels.
    ///
    /// Only `matchLabels` equality counts; a policy using match expressions or
    /// selecting a superset of the pods does not cover the deployment. Kept
    /// generated policies never cover a deployment, so they are regenerated.
    pub fn covers_ingress(&self, deployment: &Deployment) -> Option<&NetworkPolicy> {
        self.ingress
            .get(&deployment.namespace)?
            .iter()
            .filter(|p| !p.is_generated())
            .find(|p| labels_match(&p.spec.pod_selector, &deployment.pod_labels))
    }

    pub fn ingress(&self, namespace: &str) -> &[NetworkPolicy] {
        self.ingress.get(namespace).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn egress(&self, namespace: &str) -> &[NetworkPolicy] {
        self.egress.get(namespace).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl FromIterator<NetworkPolicy> for ExistingPolicies {
    fn from_iter<T: IntoIterator<Item = NetworkPolicy>>(iter: T) -> Self {
        let mut policies = Self::default();
        for policy in iter {
            if policy.affects_egress() {
                policies
                    .egress
                    .entry(policy.namespace.clone())
                    .or_default()
                    .push(policy.clone());
            }
            if policy.affects_ingress() {
                policies
                    .ingress
                    .entry(policy.namespace.clone())
                    .or_default()
                    .push(policy);
            }
        }
        policies
    }
}
