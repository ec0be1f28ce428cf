use ahash::AHashMap as HashMap;
use netpol_generator_core::{Deployment, Entity, EntityType, NetworkFlow};
use std::collections::BTreeSet;

/// Index of a node within a [`Graph`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// A directed graph of the entities observed in network flows.
///
/// Nodes are held in an arena and refer to one another by [`NodeId`]. Each
/// entity key maps to exactly one node.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    by_entity: HashMap<Entity, NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    entity: Entity,

    /// Unset when the entity is not a deployment visible to the caller, either
    /// because access is restricted or because the deployment was deleted.
    deployment: Option<Deployment>,

    incoming: BTreeSet<NodeId>,
    outgoing: BTreeSet<NodeId>,
}

// === impl Graph ===

impl Graph {
    /// Builds a graph with one node per distinct flow endpoint and one edge
    /// per distinct source/destination pair.
    pub fn from_flows<'f>(flows: impl IntoIterator<Item = &'f NetworkFlow>) -> Self {
        let mut graph = Self::default();
        graph.add_flows(flows);
        graph
    }

    pub fn add_flows<'f>(&mut self, flows: impl IntoIterator<Item = &'f NetworkFlow>) {
        for flow in flows {
            self.add_edge(&flow.props.src_entity, &flow.props.dst_entity);
        }
    }

    /// Adds an edge from `src` into `dst`, creating either node as needed.
    pub fn add_edge(&mut self, src: &Entity, dst: &Entity) {
        let src = self.get_or_insert(src);
        let dst = self.get_or_insert(dst);
        self.nodes[src.0].outgoing.insert(dst);
        self.nodes[dst.0].incoming.insert(src);
    }

    /// Attaches each deployment to its node, creating the node if no flow
    /// referenced it. A later deployment with the same ID replaces an earlier
    /// one.
    pub fn add_deployments(&mut self, deployments: impl IntoIterator<Item = Deployment>) {
        for deployment in deployments {
            let id = self.get_or_insert(&Entity::deployment(deployment.id.clone()));
            self.nodes[id.0].deployment = Some(deployment);
        }
    }

    pub fn get(&self, entity: &Entity) -> Option<NodeId> {
        self.by_entity.get(&entity.key()).copied()
    }

    /// # Panics
    ///
    /// If `id` was not issued by this graph.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Iterates over the nodes with an edge into `id`.
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.nodes[id.0].incoming.iter().map(|src| &self.nodes[src.0])
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    fn get_or_insert(&mut self, entity: &Entity) -> NodeId {
        let key = entity.key();
        if let Some(id) = self.by_entity.get(&key) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            entity: key.clone(),
            deployment: None,
            incoming: BTreeSet::new(),
            outgoing: BTreeSet::new(),
        });
        self.by_entity.insert(key, id);
        id
    }
}

// === impl Node ===

impl Node {
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn deployment(&self) -> Option<&Deployment> {
        self.deployment.as_ref()
    }

    pub fn incoming(&self) -> &BTreeSet<NodeId> {
        &self.incoming
    }

    pub fn outgoing(&self) -> &BTreeSet<NodeId> {
        &self.outgoing
    }

    /// Indicates whether this node stands for traffic from outside the
    /// cluster.
    pub fn is_external(&self) -> bool {
        matches!(
            self.entity.ty,
            EntityType::Internet | EntityType::ExternalSource
        )
    }
}
