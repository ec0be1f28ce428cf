use crate::reconcile::ExistingPolicies;
use maplit::btreemap;
use netpol_generator_core::{
    Deployment, IngressRule, NetworkPolicy, NetworkPolicySpec, PolicyType, GENERATED_LABEL,
    GENERATED_NAME_PREFIX, NETWORK_POLICY_API_VERSION,
};
use tracing::debug;

/// Wraps `rule` into an ingress policy for `deployment`.
///
/// Returns `None` if a kept user policy already selects exactly the
/// deployment's pods for ingress.
pub fn generate_policy(
    deployment: &Deployment,
    rule: IngressRule,
    existing: &ExistingPolicies,
) -> Option<NetworkPolicy> {
    if let Some(policy) = existing.covers_ingress(deployment) {
        debug!(
            deployment = %deployment.id,
            policy = %policy.name,
            "Ingress already covered by an existing policy"
        );
        return None;
    }

    // A policy without ingress rules is how Kubernetes spells deny-all.
    let ingress = if rule.is_deny_all() {
        Vec::new()
    } else {
        vec![rule]
    };

    Some(NetworkPolicy {
        id: String::new(),
        name: format!("{GENERATED_NAME_PREFIX}{}", deployment.name),
        namespace: deployment.namespace.clone(),
        cluster_id: deployment.cluster_id.clone(),
        cluster_name: deployment.cluster_name.clone(),
        labels: btreemap! {GENERATED_LABEL.to_string() => "true".to_string()},
        api_version: NETWORK_POLICY_API_VERSION.to_string(),
        spec: NetworkPolicySpec {
            pod_selector: deployment.selector(),
            policy_types: vec![PolicyType::Ingress],
            ingress,
        },
    })
}
