use crate::{Cluster, Error, NetworkPolicy, ResourceExt};
use netpol_generator_core::{
    self as model, IngressRule, NetworkPolicyPeer, NetworkPolicySpec, PolicyType, Selector,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const KIND: &str = "NetworkPolicy";

/// The parts of a Kubernetes policy spec that the generator reads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spec {
    #[serde(default)]
    pod_selector: Selector,
    #[serde(default)]
    policy_types: Option<Vec<PolicyType>>,
    #[serde(default)]
    ingress: Option<Vec<Rule>>,
    #[serde(default)]
    egress: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct Rule {
    #[serde(default)]
    from: Option<Vec<NetworkPolicyPeer>>,
}

/// Renders a policy as a Kubernetes resource.
pub fn to_k8s(policy: &model::NetworkPolicy) -> Result<NetworkPolicy, Error> {
    let value = json!({
        "apiVersion": policy.api_version,
        "kind": KIND,
        "metadata": {
            "name": policy.name,
            "namespace": policy.namespace,
            "labels": policy.labels,
        },
        "spec": {
            "podSelector": policy.spec.pod_selector,
            "policyTypes": policy.spec.policy_types,
            "ingress": policy.spec.ingress,
        },
    });
    serde_json::from_value(value).map_err(|source| Error::Invalid {
        kind: KIND,
        name: policy.name.clone(),
        source,
    })
}

/// Reads an existing Kubernetes policy.
///
/// Only ingress rules are carried over. As in Kubernetes, a policy that does
/// not list its types affects ingress, and egress too if it has egress rules;
/// an ingress rule without `from` admits every source.
pub fn from_k8s(np: &NetworkPolicy, cluster: &Cluster) -> Result<model::NetworkPolicy, Error> {
    let name = np.name_any();
    let namespace = np.namespace().ok_or_else(|| Error::MissingNamespace {
        kind: KIND,
        name: name.clone(),
    })?;

    let spec = match np.spec.as_ref() {
        Some(spec) => serde_json::to_value(spec)
            .and_then(serde_json::from_value::<Spec>)
            .map_err(|source| Error::Invalid {
                kind: KIND,
                name: name.clone(),
                source,
            })?,
        None => Spec::default(),
    };

    let policy_types = match spec.policy_types {
        Some(types) if !types.is_empty() => types,
        _ => {
            let mut types = vec![PolicyType::Ingress];
            if spec.egress.as_ref().is_some_and(|rules| !rules.is_empty()) {
                types.push(PolicyType::Egress);
            }
            debug!(policy = %name, %namespace, ?types, "Defaulted policy types");
            types
        }
    };

    let ingress = spec
        .ingress
        .unwrap_or_default()
        .into_iter()
        .map(|rule| IngressRule {
            from: Some(rule.from.unwrap_or_default()),
        })
        .collect();

    Ok(model::NetworkPolicy {
        id: np.uid().unwrap_or_else(|| format!("{namespace}/{name}")),
        name,
        namespace,
        cluster_id: cluster.id.clone(),
        cluster_name: cluster.name.clone(),
        labels: np.labels().clone(),
        api_version: model::NETWORK_POLICY_API_VERSION.to_string(),
        spec: NetworkPolicySpec {
            pod_selector: spec.pod_selector,
            policy_types,
            ingress,
        },
    })
}
