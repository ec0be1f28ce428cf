use crate::{
    assemble::generate_policy,
    ingress::{ingress_rule, NamespacesByName},
    reconcile::{reconcile, ExistingPolicies},
    Error, Graph, ProtectedNamespaces,
};
use ahash::AHashSet as HashSet;
use anyhow::{anyhow, Result};
use netpol_generator_core::{
    store::{
        BaselineAccessor, DeploymentAccessor, FlowAccessor, NamespaceAccessor, PolicyAccessor,
    },
    Entity, EntityType, NetworkPolicy, NetworkPolicyReference, Query, Request,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Generates ingress policies for a cluster from its observed traffic.
///
/// A generator holds no state between calls. Each call to
/// [`Generator::generate`] fetches its inputs from the collaborators, one at a
/// time, and either returns a complete result or fails without partial output.
#[derive(Clone)]
pub struct Generator {
    flows: Arc<dyn FlowAccessor>,
    deployments: Arc<dyn DeploymentAccessor>,
    namespaces: Arc<dyn NamespaceAccessor>,
    policies: Arc<dyn PolicyAccessor>,
    baselines: Option<Arc<dyn BaselineAccessor>>,
    protected: ProtectedNamespaces,
}

/// IDs of the deployments selected by a request's query. `None` places no
/// restriction.
type Restriction = Option<HashSet<String>>;

// === impl Generator ===

impl Generator {
    pub fn new(
        flows: Arc<dyn FlowAccessor>,
        deployments: Arc<dyn DeploymentAccessor>,
        namespaces: Arc<dyn NamespaceAccessor>,
        policies: Arc<dyn PolicyAccessor>,
    ) -> Self {
        Self {
            flows,
            deployments,
            namespaces,
            policies,
            baselines: None,
            protected: ProtectedNamespaces::default(),
        }
    }

    /// Builds each deployment's incoming edges from its network baseline,
    /// falling back to observed flows for deployments without one.
    pub fn with_baselines(mut self, baselines: Arc<dyn BaselineAccessor>) -> Self {
        self.baselines = Some(baselines);
        self
    }

    pub fn with_protected_namespaces(mut self, protected: ProtectedNamespaces) -> Self {
        self.protected = protected;
        self
    }

    /// Returns the policies to apply and references to the existing policies
    /// to delete.
    ///
    /// Dropping the returned future cancels generation at the next
    /// collaborator call.
    pub async fn generate(
        &self,
        req: &Request,
    ) -> Result<(Vec<NetworkPolicy>, Vec<NetworkPolicyReference>), Error> {
        let graph = self.network_graph(req).await.map_err(Error::Graph)?;

        let (kept, to_delete) = self
            .existing_policies(req)
            .await
            .map_err(Error::ExistingPolicies)?;
        let existing = kept.into_iter().collect::<ExistingPolicies>();

        let (query, restricted) = self.resolve_query(req).await.map_err(Error::Query)?;

        let namespaces = self
            .namespaces
            .search_namespaces(&query)
            .await
            .map_err(Error::Namespaces)?
            .into_iter()
            .map(|ns| (ns.name.clone(), ns))
            .collect::<NamespacesByName>();
        debug!(namespaces = namespaces.len(), "Fetched namespaces");

        let mut generated = Vec::new();
        for (id, node) in graph.nodes() {
            let Some(deployment) = node.deployment() else {
                continue;
            };
            if self.protected.is_protected(&deployment.namespace) {
                debug!(deployment = %deployment.id, namespace = %deployment.namespace, "Skipping protected namespace");
                continue;
            }
            if let Some(ids) = restricted.as_ref() {
                if !ids.contains(&deployment.id) {
                    debug!(deployment = %deployment.id, "Skipping deployment not selected by query");
                    continue;
                }
            }

            if let Some(policy) = existing.covers_ingress(deployment) {
                debug!(deployment = %deployment.id, policy = %policy.name, "Ingress already covered by an existing policy");
                continue;
            }

            let Some(rule) = ingress_rule(&graph, id, &namespaces) else {
                continue;
            };
            if let Some(policy) = generate_policy(deployment, rule, &existing) {
                generated.push(policy);
            }
        }

        info!(
            cluster_id = %req.cluster_id,
            generated = generated.len(),
            deleted = to_delete.len(),
            "Generated network policies"
        );
        Ok((generated, to_delete))
    }

    async fn network_graph(&self, req: &Request) -> Result<Graph> {
        let deployments = self
            .deployments
            .search_raw_deployments(&Query::cluster_id(req.cluster_id.clone()))
            .await?;
        debug!(deployments = deployments.len(), "Fetched deployments");

        let mut graph = Graph::default();

        // Deployments whose incoming edges come from flows. `None` means all.
        let mut without_baseline = None;
        if let Some(baselines) = self.baselines.as_ref() {
            let mut missing = HashSet::new();
            for deployment in &deployments {
                match baselines.network_baseline(&deployment.id).await? {
                    Some(baseline) => {
                        let dst = Entity::deployment(deployment.id.clone());
                        for peer in baseline.ingress_peers() {
                            graph.add_edge(peer, &dst);
                        }
                    }
                    None => {
                        missing.insert(deployment.id.clone());
                    }
                }
            }
            debug!(missing = missing.len(), "Fetched baselines");
            without_baseline = Some(missing);
        }

        if without_baseline.as_ref().map_or(true, |ids| !ids.is_empty()) {
            let store = self
                .flows
                .flow_store_for_cluster(&req.cluster_id)
                .ok_or_else(|| anyhow!("no flow store for cluster {}", req.cluster_id))?;
            let (flows, as_of) = store.all_flows(req.network_data_since).await?;
            debug!(flows = flows.len(), %as_of, "Fetched flows");
            graph.add_flows(flows.iter().filter(|f| {
                let dst = &f.props.dst_entity;
                without_baseline
                    .as_ref()
                    .map_or(true, |ids| dst.ty == EntityType::Deployment && ids.contains(&dst.id))
            }));
        }

        graph.add_deployments(deployments);
        debug!(nodes = graph.len(), "Built network graph");
        Ok(graph)
    }

    async fn existing_policies(
        &self,
        req: &Request,
    ) -> Result<(Vec<NetworkPolicy>, Vec<NetworkPolicyReference>)> {
        let existing = self
            .policies
            .network_policies(&req.cluster_id, None)
            .await?;
        debug!(existing = existing.len(), mode = %req.delete_existing, "Fetched existing policies");
        Ok(reconcile(existing, req.delete_existing))
    }

    /// Composes the cluster filter with the request's query and, if a query
    /// was supplied, resolves the IDs of the deployments it selects.
    async fn resolve_query(&self, req: &Request) -> Result<(Query, Restriction)> {
        let cluster = Query::cluster_id(req.cluster_id.clone());
        let parsed = match req.query.as_deref() {
            Some(text) => text.parse::<Query>()?,
            None => Query::default(),
        };
        if parsed.is_empty() {
            return Ok((cluster, None));
        }

        let query = cluster.and(parsed);
        let ids = self
            .deployments
            .search(&query)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect::<HashSet<_>>();
        debug!(%query, selected = ids.len(), "Resolved query");

        // An empty result places no restriction.
        let restricted = if ids.is_empty() { None } else { Some(ids) };
        Ok((query, restricted))
    }
}
