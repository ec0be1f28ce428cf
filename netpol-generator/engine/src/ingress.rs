use crate::graph::{Graph, Node, NodeId};
use ahash::AHashMap as HashMap;
use netpol_generator_core::{
    Deployment, IngressRule, NamespaceMetadata, NetworkPolicyPeer, Selector,
};
use tracing::debug;

/// Namespaces visible to the caller, by name.
pub type NamespacesByName = HashMap<String, NamespaceMetadata>;

/// Synthesizes the ingress rule for the deployment at `target`.
///
/// The first matching case wins:
///
/// 1. If the deployment exposes a port outside the cluster, or receives traffic
///    from outside the cluster, every source is allowed.
/// 2. If any peer is masked, every pod in every namespace is allowed.
/// 3. Otherwise each peer deployment is allowed individually. Peers in other
///    namespaces are additionally scoped by a namespace selector, which
///    selects all namespaces if the peer's namespace is not visible.
///
/// A deployment without incoming traffic gets a rule that admits nothing.
/// Returns `None` if `target` has no deployment.
pub fn ingress_rule(
    graph: &Graph,
    target: NodeId,
    namespaces: &NamespacesByName,
) -> Option<IngressRule> {
    let deployment = graph.node(target).deployment()?;

    if deployment.is_externally_exposed() || graph.incoming(target).any(Node::is_external) {
        debug!(deployment = %deployment.id, "Reachable from outside the cluster; allowing all sources");
        return Some(IngressRule::allow_all());
    }

    if graph.incoming(target).any(|peer| peer.deployment().is_none()) {
        debug!(deployment = %deployment.id, "Masked peer; allowing all pods in all namespaces");
        return Some(IngressRule::allow_all_pods_all_namespaces());
    }

    let peers = graph
        .incoming(target)
        .filter_map(Node::deployment)
        .map(|peer| peer_for(peer, &deployment.namespace, namespaces))
        .collect::<Vec<_>>();
    if peers.is_empty() {
        return Some(IngressRule::deny_all());
    }
    Some(IngressRule::from_peers(peers))
}

fn peer_for(peer: &Deployment, target_ns: &str, namespaces: &NamespacesByName) -> NetworkPolicyPeer {
    let namespace_selector = if peer.namespace == target_ns {
        None
    } else {
        match namespaces.get(&peer.namespace) {
            Some(ns) => Some(ns.selector()),
            None => {
                debug!(peer = %peer.id, namespace = %peer.namespace, "Peer namespace is not visible");
                Some(Selector::default())
            }
        }
    };

    NetworkPolicyPeer {
        pod_selector: Some(peer.selector()),
        namespace_selector,
    }
}
