use crate::{Entity, L4Protocol};
use serde::{Deserialize, Serialize};

/// The connections a deployment is known to make and accept.
///
/// When a deployment has a baseline, its ingress peers stand in for the flows
/// observed into it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkBaseline {
    pub deployment_id: String,
    #[serde(default)]
    pub deployment_name: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub peers: Vec<BaselinePeer>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselinePeer {
    pub entity: Entity,
    #[serde(default)]
    pub properties: Vec<BaselineConnection>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineConnection {
    /// Set when the peer connects to the baseline's deployment, unset when
    /// the deployment connects to the peer.
    #[serde(default)]
    pub ingress: bool,
    #[serde(default)]
    pub port: u32,
    #[serde(default)]
    pub protocol: L4Protocol,
}

// === impl NetworkBaseline ===

impl NetworkBaseline {
    /// Iterates over the peers with at least one connection into the
    /// deployment.
    pub fn ingress_peers(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.peers
            .iter()
            .filter(|p| p.properties.iter().any(|c| c.ingress))
            .map(|p| &p.entity)
    }
}

// === impl BaselinePeer ===

impl BaselinePeer {
    pub fn new(entity: Entity, ingress: bool, port: u32, protocol: L4Protocol) -> Self {
        Self {
            entity,
            properties: vec![BaselineConnection {
                ingress,
                port,
                protocol,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingress_peers_skip_egress_only_peers() {
        let mut both = BaselinePeer::new(Entity::deployment("c"), false, 80, L4Protocol::Tcp);
        both.properties.push(BaselineConnection {
            ingress: true,
            port: 8080,
            protocol: L4Protocol::Tcp,
        });
        let baseline = NetworkBaseline {
            deployment_id: "a".to_string(),
            peers: vec![
                BaselinePeer::new(Entity::deployment("b"), false, 80, L4Protocol::Tcp),
                both,
                BaselinePeer::new(Entity::external_source("cidr"), true, 443, L4Protocol::Tcp),
            ],
            ..Default::default()
        };
        assert_eq!(
            baseline.ingress_peers().cloned().collect::<Vec<_>>(),
            vec![Entity::deployment("c"), Entity::external_source("cidr")]
        );
    }

    #[test]
    fn reads_camel_case() {
        let baseline: NetworkBaseline = serde_json::from_value(serde_json::json!({
            "deploymentId": "a",
            "peers": [{
                "entity": {"type": "INTERNET"},
                "properties": [{"ingress": true, "port": 443, "protocol": "TCP"}],
            }],
        }))
        .unwrap();
        assert_eq!(
            baseline.ingress_peers().collect::<Vec<_>>(),
            vec![&Entity::internet()]
        );
    }
}
