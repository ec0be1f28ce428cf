use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies a node of the network graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub ty: EntityType,
    #[serde(default)]
    pub id: String,
}

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    #[default]
    Deployment,
    /// A CIDR-identified source outside the cluster.
    ExternalSource,
    /// Catch-all for anything outside the cluster that is not otherwise known.
    Internet,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFlow {
    pub props: FlowProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowProperties {
    pub src_entity: Entity,
    pub dst_entity: Entity,
    #[serde(default)]
    pub dst_port: u32,
    #[serde(default)]
    pub l4_protocol: L4Protocol,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum L4Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

// === impl Entity ===

impl Entity {
    pub fn deployment(id: impl Into<String>) -> Self {
        Self {
            ty: EntityType::Deployment,
            id: id.into(),
        }
    }

    pub fn external_source(id: impl Into<String>) -> Self {
        Self {
            ty: EntityType::ExternalSource,
            id: id.into(),
        }
    }

    pub fn internet() -> Self {
        Self {
            ty: EntityType::Internet,
            id: String::new(),
        }
    }

    /// Returns the key under which this entity is tracked. All internet
    /// entities share a single key, whatever ID they carry.
    pub fn key(&self) -> Self {
        match self.ty {
            EntityType::Internet => Self::internet(),
            _ => self.clone(),
        }
    }
}

// === impl NetworkFlow ===

impl NetworkFlow {
    pub fn new(src: Entity, dst: Entity, dst_port: u32, l4_protocol: L4Protocol) -> Self {
        Self {
            props: FlowProperties {
                src_entity: src,
                dst_entity: dst,
                dst_port,
                l4_protocol,
            },
            last_seen_timestamp: None,
        }
    }

    /// Indicates whether the flow was active at or after `since`. Flows without
    /// a last-seen timestamp are still active.
    pub fn seen_since(&self, since: Option<DateTime<Utc>>) -> bool {
        match (since, self.last_seen_timestamp) {
            (Some(since), Some(last_seen)) => last_seen >= since,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn internet_entities_share_a_key() {
        let a = Entity {
            ty: EntityType::Internet,
            id: "afa12424-bde3-4313-b810-bb463cbe8f90".to_string(),
        };
        assert_eq!(a.key(), Entity::internet());
        assert_eq!(Entity::deployment("d").key(), Entity::deployment("d"));
    }

    #[test]
    fn seen_since() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut flow = NetworkFlow::new(
            Entity::deployment("a"),
            Entity::deployment("b"),
            8000,
            L4Protocol::Tcp,
        );
        assert!(flow.seen_since(Some(t1)), "active flows are always current");

        flow.last_seen_timestamp = Some(t0);
        assert!(flow.seen_since(None));
        assert!(flow.seen_since(Some(t0)));
        assert!(!flow.seen_since(Some(t1)));
    }

    #[test]
    fn deserializes_flow() {
        let flow: NetworkFlow = serde_json::from_value(serde_json::json!({
            "props": {
                "srcEntity": {"type": "INTERNET"},
                "dstEntity": {"type": "DEPLOYMENT", "id": "depA"},
                "dstPort": 443,
                "l4Protocol": "TCP",
            },
        }))
        .unwrap();
        assert_eq!(flow.props.src_entity, Entity::internet());
        assert_eq!(flow.props.dst_entity, Entity::deployment("depA"));
        assert_eq!(flow.last_seen_timestamp, None);
    }
}
