use crate::{Generator, ProtectedNamespaces};
use chrono::{DateTime, TimeZone, Utc};
use maplit::*;
use netpol_generator_core::{
    namespace::NAMESPACE_NAME_LABELS,
    store::{
        BaselineAccessor, DeploymentAccessor, FlowAccessor, FlowStore, NamespaceAccessor,
        PolicyAccessor, SearchResult,
    },
    BaselinePeer, DeleteExisting, Deployment, Entity, Exposure, IngressRule, L4Protocol,
    NamespaceMetadata, NetworkBaseline, NetworkFlow, NetworkPolicy, NetworkPolicyPeer, NetworkPolicyReference, NetworkPolicySpec,
    PolicyType, PortConfig, Query, Request, Selector, GENERATED_LABEL,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;

const CLUSTER_ID: &str = "mycluster";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Stage {
    FlowStore,
    Flows,
    Deployments,
    Policies,
    Search,
    Namespaces,
    Baselines,
}

#[derive(Clone, Default)]
struct TestStore {
    flows: Vec<NetworkFlow>,
    deployments: Vec<Deployment>,
    namespaces: Vec<NamespaceMetadata>,
    policies: Vec<NetworkPolicy>,
    /// Unset when no baseline collaborator is configured.
    baselines: Option<Vec<NetworkBaseline>>,
    fail: Option<Stage>,
}

struct TestConfig {
    store: TestStore,
    protected: ProtectedNamespaces,
    _tracing: tracing::subscriber::DefaultGuard,
}

// === impl TestConfig ===

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            store: TestStore::default(),
            protected: ProtectedNamespaces::default(),
            _tracing: Self::init_tracing(),
        }
    }
}

impl TestConfig {
    fn with_store(store: TestStore) -> Self {
        Self {
            store,
            ..Default::default()
        }
    }

    fn generator(&self) -> Generator {
        let store = Arc::new(self.store.clone());
        let generator = Generator::new(store.clone(), store.clone(), store.clone(), store.clone())
            .with_protected_namespaces(self.protected.clone());
        if self.store.baselines.is_some() {
            return generator.with_baselines(store);
        }
        generator
    }

    async fn generate(&self, req: Request) -> (Vec<NetworkPolicy>, Vec<NetworkPolicyReference>) {
        let (mut generated, to_delete) = self
            .generator()
            .generate(&req)
            .await
            .expect("generation must succeed");
        for policy in &generated {
            assert_eq!(
                policy.labels.get(GENERATED_LABEL).map(String::as_str),
                Some("true")
            );
            assert_eq!(policy.api_version, "networking.k8s.io/v1");
        }
        canonicalize(&mut generated);
        (generated, to_delete)
    }

    fn init_tracing() -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(tracing::Level::TRACE)
                .finish(),
        )
    }
}

// === impl TestStore ===

impl TestStore {
    fn check(&self, stage: Stage) -> anyhow::Result<()> {
        if self.fail == Some(stage) {
            anyhow::bail!("{stage:?} unavailable");
        }
        Ok(())
    }
}

impl FlowAccessor for TestStore {
    fn flow_store_for_cluster(&self, cluster_id: &str) -> Option<Arc<dyn FlowStore>> {
        if cluster_id != CLUSTER_ID || self.fail == Some(Stage::FlowStore) {
            return None;
        }
        Some(Arc::new(self.clone()))
    }
}

#[async_trait::async_trait]
impl FlowStore for TestStore {
    async fn all_flows(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<(Vec<NetworkFlow>, DateTime<Utc>)> {
        self.check(Stage::Flows)?;
        let flows = self
            .flows
            .iter()
            .filter(|f| f.seen_since(since))
            .cloned()
            .collect();
        Ok((flows, since.unwrap_or_default()))
    }
}

#[async_trait::async_trait]
impl DeploymentAccessor for TestStore {
    async fn search_raw_deployments(&self, query: &Query) -> anyhow::Result<Vec<Deployment>> {
        self.check(Stage::Deployments)?;
        Ok(self
            .deployments
            .iter()
            .filter(|d| query.matches_deployment(d))
            .cloned()
            .collect())
    }

    async fn search(&self, query: &Query) -> anyhow::Result<Vec<SearchResult>> {
        self.check(Stage::Search)?;
        Ok(self
            .deployments
            .iter()
            .filter(|d| query.matches_deployment(d))
            .map(|d| SearchResult { id: d.id.clone() })
            .collect())
    }
}

#[async_trait::async_trait]
impl NamespaceAccessor for TestStore {
    async fn search_namespaces(&self, query: &Query) -> anyhow::Result<Vec<NamespaceMetadata>> {
        self.check(Stage::Namespaces)?;
        Ok(self
            .namespaces
            .iter()
            .filter(|ns| query.matches_namespace(ns))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl PolicyAccessor for TestStore {
    async fn network_policies(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> anyhow::Result<Vec<NetworkPolicy>> {
        self.check(Stage::Policies)?;
        Ok(self
            .policies
            .iter()
            .filter(|p| p.cluster_id == cluster_id)
            .filter(|p| namespace.map_or(true, |ns| p.namespace == ns))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl BaselineAccessor for TestStore {
    async fn network_baseline(
        &self,
        deployment_id: &str,
    ) -> anyhow::Result<Option<NetworkBaseline>> {
        self.check(Stage::Baselines)?;
        Ok(self
            .baselines
            .iter()
            .flatten()
            .find(|b| b.deployment_id == deployment_id)
            .cloned())
    }
}

fn request(delete_existing: DeleteExisting) -> Request {
    Request {
        cluster_id: CLUSTER_ID.to_string(),
        delete_existing,
        network_data_since: None,
        query: None,
    }
}

fn mk_deployment(name: &str, ns: &str) -> Deployment {
    Deployment {
        id: name.to_string(),
        name: name.to_string(),
        namespace: ns.to_string(),
        cluster_id: CLUSTER_ID.to_string(),
        pod_labels: btreemap! {"app".to_string() => name.to_string()},
        ..Default::default()
    }
}

fn mk_exposed(name: &str, ns: &str, exposure: Exposure) -> Deployment {
    let mut deployment = mk_deployment(name, ns);
    deployment.ports.push(PortConfig {
        name: Some("https".to_string()),
        container_port: 443,
        protocol: L4Protocol::Tcp,
        exposure,
    });
    deployment
}

fn mk_namespace(name: &str) -> NamespaceMetadata {
    NamespaceMetadata {
        id: format!("ns-{name}"),
        name: name.to_string(),
        cluster_id: CLUSTER_ID.to_string(),
        labels: btreemap! {NAMESPACE_NAME_LABELS[0].to_string() => name.to_string()},
        ..Default::default()
    }
}

fn mk_policy(name: &str, ns: &str, app: &str, generated: bool) -> NetworkPolicy {
    let labels = if generated {
        btreemap! {GENERATED_LABEL.to_string() => "true".to_string()}
    } else {
        Default::default()
    };
    NetworkPolicy {
        id: format!("id-{name}"),
        name: name.to_string(),
        namespace: ns.to_string(),
        cluster_id: CLUSTER_ID.to_string(),
        labels,
        spec: NetworkPolicySpec {
            pod_selector: Selector::from_map(btreemap! {"app".to_string() => app.to_string()}),
            policy_types: vec![PolicyType::Ingress],
            ingress: Vec::new(),
        },
        ..Default::default()
    }
}

fn flow(src: &str, dst: &str) -> NetworkFlow {
    NetworkFlow::new(
        Entity::deployment(src),
        Entity::deployment(dst),
        8000,
        L4Protocol::Tcp,
    )
}

fn baseline(deployment: &str, peers: Vec<BaselinePeer>) -> NetworkBaseline {
    NetworkBaseline {
        deployment_id: deployment.to_string(),
        deployment_name: deployment.to_string(),
        cluster_id: CLUSTER_ID.to_string(),
        peers,
        ..Default::default()
    }
}

fn ingress_from(entity: Entity) -> BaselinePeer {
    BaselinePeer::new(entity, true, 80, L4Protocol::Tcp)
}

fn egress_to(entity: Entity) -> BaselinePeer {
    BaselinePeer::new(entity, false, 80, L4Protocol::Tcp)
}

fn pods(app: &str) -> Option<Selector> {
    Some(Selector::from_map(
        btreemap! {"app".to_string() => app.to_string()},
    ))
}

fn namespace_named(name: &str) -> Option<Selector> {
    Some(Selector::from_map(
        btreemap! {NAMESPACE_NAME_LABELS[0].to_string() => name.to_string()},
    ))
}

/// Sorts policies by name and peers by content, since neither order is
/// meaningful.
fn canonicalize(policies: &mut [NetworkPolicy]) {
    for policy in policies.iter_mut() {
        for rule in &mut policy.spec.ingress {
            if let Some(from) = rule.from.as_mut() {
                from.sort_by_key(|p| format!("{p:?}"));
            }
        }
    }
    policies.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
}

fn find<'p>(policies: &'p [NetworkPolicy], name: &str) -> &'p NetworkPolicy {
    policies
        .iter()
        .find(|p| p.name == format!("stackrox-generated-{name}"))
        .unwrap_or_else(|| panic!("no policy generated for {name}"))
}

fn assert_not_generated(policies: &[NetworkPolicy], name: &str) {
    assert!(
        policies
            .iter()
            .all(|p| p.name != format!("stackrox-generated-{name}")),
        "unexpected policy for {name}"
    );
}

#[tokio::test]
async fn same_namespace_peer() {
    let test = TestConfig::with_store(TestStore {
        flows: vec![flow("a", "b")],
        deployments: vec![mk_deployment("a", "ns1"), mk_deployment("b", "ns1")],
        namespaces: vec![mk_namespace("ns1")],
        ..Default::default()
    });
    let (generated, to_delete) = test.generate(request(DeleteExisting::None)).await;
    assert!(to_delete.is_empty());
    assert_eq!(generated.len(), 2);

    let b = find(&generated, "b");
    assert_eq!(b.namespace, "ns1");
    assert_eq!(b.cluster_id, CLUSTER_ID);
    assert_eq!(b.spec.pod_selector, Selector::from_iter(Some(("app", "b"))));
    assert_eq!(b.spec.policy_types, vec![PolicyType::Ingress]);
    assert_eq!(
        b.spec.ingress,
        vec![IngressRule::from_peers(Some(NetworkPolicyPeer {
            pod_selector: pods("a"),
            namespace_selector: None,
        }))]
    );

    let a = find(&generated, "a");
    assert!(a.spec.ingress.is_empty(), "a has no incoming traffic");
}

#[tokio::test]
async fn external_exposure_ignores_peers() {
    let test = TestConfig::with_store(TestStore {
        flows: vec![flow("d", "c")],
        deployments: vec![
            mk_exposed("c", "ns2", Exposure::External),
            mk_deployment("d", "ns2"),
        ],
        namespaces: vec![mk_namespace("ns2")],
        ..Default::default()
    });
    let (generated, _) = test.generate(request(DeleteExisting::None)).await;
    assert_eq!(
        find(&generated, "c").spec.ingress,
        vec![IngressRule::allow_all()]
    );
}

#[tokio::test]
async fn delete_generated_only() {
    let test = TestConfig::with_store(TestStore {
        deployments: vec![mk_deployment("web", "ns1"), mk_deployment("db", "ns2")],
        namespaces: vec![mk_namespace("ns1"), mk_namespace("ns2")],
        policies: vec![
            mk_policy("stackrox-generated-web", "ns1", "web", true),
            mk_policy("user-db", "ns2", "db", false),
        ],
        ..Default::default()
    });
    let (generated, to_delete) = test.generate(request(DeleteExisting::GeneratedOnly)).await;
    assert_eq!(
        to_delete,
        vec![NetworkPolicyReference {
            name: "stackrox-generated-web".to_string(),
            namespace: "ns1".to_string(),
        }]
    );
    // The kept user policy already covers db.
    assert_not_generated(&generated, "db");
    find(&generated, "web");
}

#[rstest]
#[case(DeleteExisting::None, 0, false)]
#[case(DeleteExisting::GeneratedOnly, 1, false)]
#[case(DeleteExisting::All, 3, true)]
#[tokio::test]
async fn delete_modes(
    #[case] mode: DeleteExisting,
    #[case] deleted: usize,
    #[case] db_generated: bool,
) {
    let test = TestConfig::with_store(TestStore {
        deployments: vec![mk_deployment("db", "ns1")],
        policies: vec![
            mk_policy("stackrox-generated-old", "ns1", "old", true),
            mk_policy("user-db", "ns1", "db", false),
            mk_policy("user-other", "ns2", "other", false),
        ],
        ..Default::default()
    });
    let (generated, to_delete) = test.generate(request(mode)).await;
    assert_eq!(to_delete.len(), deleted);
    assert_eq!(
        generated.iter().any(|p| p.name == "stackrox-generated-db"),
        db_generated
    );
}

#[tokio::test]
async fn repeated_generation_is_stable() {
    let test = TestConfig::with_store(TestStore {
        flows: vec![
            flow("a", "b"),
            flow("c", "b"),
            flow("d", "b"),
            flow("b", "c"),
            NetworkFlow::new(
                Entity::internet(),
                Entity::deployment("c"),
                443,
                L4Protocol::Tcp,
            ),
        ],
        deployments: vec![
            mk_deployment("a", "ns1"),
            mk_deployment("b", "ns1"),
            mk_deployment("c", "ns1"),
            mk_deployment("d", "ns2"),
        ],
        namespaces: vec![mk_namespace("ns1"), mk_namespace("ns2")],
        ..Default::default()
    });
    let first = test.generate(request(DeleteExisting::None)).await;
    let second = test.generate(request(DeleteExisting::None)).await;
    assert_eq!(first, second);

    let b = find(&first.0, "b");
    assert_eq!(
        b.spec.ingress,
        vec![IngressRule::from_peers([
            NetworkPolicyPeer {
                pod_selector: pods("a"),
                namespace_selector: None,
            },
            NetworkPolicyPeer {
                pod_selector: pods("c"),
                namespace_selector: None,
            },
            NetworkPolicyPeer {
                pod_selector: pods("d"),
                namespace_selector: namespace_named("ns2"),
            },
        ])]
    );
    assert_eq!(
        find(&first.0, "c").spec.ingress,
        vec![IngressRule::allow_all()]
    );
    assert!(find(&first.0, "d").spec.ingress.is_empty());
}

/// The policies expected for deployments a, b and c in ns1 and d in ns2,
/// where b accepts traffic from a, c and d, and c from a and outside the
/// cluster.
fn assert_abcd_policies(generated: &[NetworkPolicy]) {
    assert_eq!(generated.len(), 4);
    assert!(find(generated, "a").spec.ingress.is_empty());
    assert_eq!(
        find(generated, "b").spec.ingress,
        vec![IngressRule::from_peers([
            NetworkPolicyPeer {
                pod_selector: pods("a"),
                namespace_selector: None,
            },
            NetworkPolicyPeer {
                pod_selector: pods("c"),
                namespace_selector: None,
            },
            NetworkPolicyPeer {
                pod_selector: pods("d"),
                namespace_selector: namespace_named("ns2"),
            },
        ])]
    );
    assert_eq!(
        find(generated, "c").spec.ingress,
        vec![IngressRule::allow_all()]
    );
    assert!(find(generated, "d").spec.ingress.is_empty());
}

fn abcd_deployments() -> Vec<Deployment> {
    vec![
        mk_deployment("a", "ns1"),
        mk_deployment("b", "ns1"),
        mk_deployment("c", "ns1"),
        mk_deployment("d", "ns2"),
    ]
}

#[tokio::test]
async fn baselines_replace_flows() {
    let test = TestConfig::with_store(TestStore {
        deployments: abcd_deployments(),
        namespaces: vec![mk_namespace("ns1"), mk_namespace("ns2")],
        baselines: Some(vec![
            baseline(
                "a",
                vec![
                    egress_to(Entity::deployment("b")),
                    egress_to(Entity::deployment("c")),
                ],
            ),
            baseline(
                "b",
                vec![
                    ingress_from(Entity::deployment("a")),
                    ingress_from(Entity::deployment("c")),
                    ingress_from(Entity::deployment("d")),
                ],
            ),
            baseline(
                "c",
                vec![
                    egress_to(Entity::deployment("b")),
                    ingress_from(Entity::deployment("a")),
                    ingress_from(Entity::external_source("192.0.2.0/24")),
                ],
            ),
            baseline("d", vec![egress_to(Entity::deployment("b"))]),
        ]),
        // Every deployment has a baseline, so the flow store is never needed.
        fail: Some(Stage::FlowStore),
        ..Default::default()
    });
    let (generated, to_delete) = test.generate(request(DeleteExisting::None)).await;
    assert!(to_delete.is_empty());
    assert_abcd_policies(&generated);
}

#[tokio::test]
async fn missing_baselines_fall_back_to_flows() {
    let test = TestConfig::with_store(TestStore {
        flows: vec![
            flow("a", "b"),
            flow("a", "c"),
            flow("c", "b"),
            flow("d", "b"),
            NetworkFlow::new(Entity::internet(), Entity::deployment("c"), 0, L4Protocol::Tcp),
        ],
        deployments: abcd_deployments(),
        namespaces: vec![mk_namespace("ns1"), mk_namespace("ns2")],
        baselines: Some(Vec::new()),
        ..Default::default()
    });
    let (generated, to_delete) = test.generate(request(DeleteExisting::None)).await;
    assert!(to_delete.is_empty());
    assert_abcd_policies(&generated);
}

#[tokio::test]
async fn flows_only_feed_deployments_without_baselines() {
    // b has a baseline, so the flow from the invisible x does not widen its
    // rule; h has none, so the flow from the deleted y does.
    let test = TestConfig::with_store(TestStore {
        flows: vec![flow("x", "b"), flow("y", "h"), flow("a", "h")],
        deployments: vec![
            mk_deployment("a", "foo"),
            mk_deployment("b", "foo"),
            mk_deployment("h", "foo"),
        ],
        namespaces: vec![mk_namespace("foo")],
        baselines: Some(vec![
            baseline("a", Vec::new()),
            baseline("b", vec![ingress_from(Entity::deployment("a"))]),
        ]),
        ..Default::default()
    });
    let (generated, _) = test.generate(request(DeleteExisting::None)).await;
    assert!(find(&generated, "a").spec.ingress.is_empty());
    assert_eq!(
        find(&generated, "b").spec.ingress,
        vec![IngressRule::from_peers(Some(NetworkPolicyPeer {
            pod_selector: pods("a"),
            namespace_selector: None,
        }))]
    );
    assert_eq!(
        find(&generated, "h").spec.ingress,
        vec![IngressRule::allow_all_pods_all_namespaces()]
    );
}

#[tokio::test]
async fn covered_deployments_are_skipped() {
    // The masked peer would widen db's rule, but the user policy selecting
    // exactly db's pods means no rule is needed at all.
    let test = TestConfig::with_store(TestStore {
        flows: vec![flow("x", "db"), flow("db", "web")],
        deployments: vec![mk_deployment("db", "ns1"), mk_deployment("web", "ns1")],
        policies: vec![mk_policy("user-db", "ns1", "db", false)],
        ..Default::default()
    });
    let (generated, _) = test.generate(request(DeleteExisting::None)).await;
    assert_not_generated(&generated, "db");
    assert_eq!(
        find(&generated, "web").spec.ingress,
        vec![IngressRule::from_peers(Some(NetworkPolicyPeer {
            pod_selector: pods("db"),
            namespace_selector: None,
        }))]
    );
}

#[tokio::test]
async fn masked_and_hidden_peers() {
    // x is invisible to the caller and y was deleted; both still appear in
    // flows. f lives in a namespace whose metadata is not visible.
    let test = TestConfig::with_store(TestStore {
        flows: vec![
            flow("b", "a"),
            flow("d", "a"),
            flow("a", "b"),
            flow("x", "b"),
            flow("f", "c"),
            flow("a", "c"),
            flow("y", "h"),
        ],
        deployments: vec![
            mk_deployment("a", "foo"),
            mk_deployment("b", "foo"),
            mk_deployment("c", "foo"),
            mk_deployment("d", "bar"),
            mk_deployment("f", "qux"),
            mk_deployment("h", "foo"),
        ],
        namespaces: vec![mk_namespace("foo"), mk_namespace("bar")],
        ..Default::default()
    });
    let (generated, _) = test.generate(request(DeleteExisting::None)).await;

    assert_eq!(
        find(&generated, "a").spec.ingress,
        vec![IngressRule::from_peers([
            NetworkPolicyPeer {
                pod_selector: pods("b"),
                namespace_selector: None,
            },
            NetworkPolicyPeer {
                pod_selector: pods("d"),
                namespace_selector: namespace_named("bar"),
            },
        ])]
    );
    assert_eq!(
        find(&generated, "b").spec.ingress,
        vec![IngressRule::allow_all_pods_all_namespaces()]
    );
    assert_eq!(
        find(&generated, "c").spec.ingress,
        vec![IngressRule::from_peers([
            NetworkPolicyPeer {
                pod_selector: pods("a"),
                namespace_selector: None,
            },
            NetworkPolicyPeer {
                pod_selector: pods("f"),
                namespace_selector: Some(Selector::default()),
            },
        ])]
    );
    assert_eq!(
        find(&generated, "h").spec.ingress,
        vec![IngressRule::allow_all_pods_all_namespaces()]
    );
    // Metadata for qux is not needed to generate f's own policy.
    assert_eq!(find(&generated, "f").namespace, "qux");
    assert_not_generated(&generated, "x");
    assert_not_generated(&generated, "y");
}

#[tokio::test]
async fn skips_protected_namespaces() {
    let mut test = TestConfig::with_store(TestStore {
        deployments: vec![
            mk_deployment("central", "stackrox"),
            mk_deployment("dns", "kube-system"),
            mk_deployment("router", "openshift-ingress"),
            mk_deployment("sensor", "acs"),
            mk_deployment("web", "default"),
        ],
        ..Default::default()
    });
    let (generated, _) = test.generate(request(DeleteExisting::None)).await;
    let names = generated.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["stackrox-generated-sensor", "stackrox-generated-web"]
    );

    test.protected = ProtectedNamespaces::new("acs");
    let (generated, _) = test.generate(request(DeleteExisting::None)).await;
    let names = generated.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["stackrox-generated-web", "stackrox-generated-central"]
    );
}

#[tokio::test]
async fn query_restricts_deployments() {
    let test = TestConfig::with_store(TestStore {
        flows: vec![flow("a", "b"), flow("d", "b")],
        deployments: vec![
            mk_deployment("a", "ns1"),
            mk_deployment("b", "ns1"),
            mk_deployment("d", "ns2"),
        ],
        namespaces: vec![mk_namespace("ns1"), mk_namespace("ns2")],
        ..Default::default()
    });
    let mut req = request(DeleteExisting::None);
    req.query = Some("Namespace: ns1".to_string());
    let (generated, _) = test.generate(req).await;

    let names = generated.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["stackrox-generated-a", "stackrox-generated-b"]);

    // Only ns1 metadata matched the query, so ns2 is not visible when
    // scoping d.
    assert_eq!(
        find(&generated, "b").spec.ingress,
        vec![IngressRule::from_peers([
            NetworkPolicyPeer {
                pod_selector: pods("a"),
                namespace_selector: None,
            },
            NetworkPolicyPeer {
                pod_selector: pods("d"),
                namespace_selector: Some(Selector::default()),
            },
        ])]
    );
}

#[tokio::test]
async fn query_without_matches_places_no_restriction() {
    let test = TestConfig::with_store(TestStore {
        deployments: vec![mk_deployment("a", "ns1"), mk_deployment("b", "ns2")],
        ..Default::default()
    });
    let mut req = request(DeleteExisting::None);
    req.query = Some("Deployment: nothing".to_string());
    let (generated, _) = test.generate(req).await;
    assert_eq!(generated.len(), 2);
}

#[tokio::test]
async fn filters_flows_by_time() {
    let since = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let mut stale = flow("old", "b");
    stale.last_seen_timestamp = Some(since - chrono::Duration::days(1));
    let mut fresh = flow("a", "b");
    fresh.last_seen_timestamp = Some(since);
    let test = TestConfig::with_store(TestStore {
        flows: vec![stale, fresh],
        deployments: vec![mk_deployment("a", "ns1"), mk_deployment("b", "ns1")],
        ..Default::default()
    });

    let mut req = request(DeleteExisting::None);
    req.network_data_since = Some(since);
    let (generated, _) = test.generate(req).await;
    assert_eq!(
        find(&generated, "b").spec.ingress,
        vec![IngressRule::from_peers(Some(NetworkPolicyPeer {
            pod_selector: pods("a"),
            namespace_selector: None,
        }))]
    );

    // Without a lower bound, the stale masked peer widens the rule.
    let (generated, _) = test.generate(request(DeleteExisting::None)).await;
    assert_eq!(
        find(&generated, "b").spec.ingress,
        vec![IngressRule::allow_all_pods_all_namespaces()]
    );
}

#[rstest]
#[case(Stage::FlowStore, "generating network graph: no flow store for cluster mycluster")]
#[case(Stage::Flows, "generating network graph: Flows unavailable")]
#[case(Stage::Deployments, "generating network graph: Deployments unavailable")]
#[case(Stage::Policies, "obtaining existing network policies: Policies unavailable")]
#[case(Stage::Search, "parsing query: Search unavailable")]
#[case(Stage::Namespaces, "could not obtain namespaces metadata: Namespaces unavailable")]
#[case(Stage::Baselines, "generating network graph: Baselines unavailable")]
#[tokio::test]
async fn collaborator_errors_name_their_stage(#[case] stage: Stage, #[case] msg: &str) {
    let test = TestConfig::with_store(TestStore {
        flows: vec![flow("a", "b")],
        deployments: vec![mk_deployment("a", "ns1"), mk_deployment("b", "ns1")],
        baselines: Some(Vec::new()),
        fail: Some(stage),
        ..Default::default()
    });
    let mut req = request(DeleteExisting::None);
    req.query = Some("Namespace: ns1".to_string());
    let err = test
        .generator()
        .generate(&req)
        .await
        .expect_err("generation must fail");
    assert_eq!(err.to_string(), msg);
}

#[tokio::test]
async fn rejects_invalid_query() {
    let test = TestConfig::default();
    let mut req = request(DeleteExisting::None);
    req.query = Some("Color: blue".to_string());
    let err = test
        .generator()
        .generate(&req)
        .await
        .expect_err("query must be rejected");
    assert_eq!(err.to_string(), "parsing query: unknown field \"Color\"");
}

#[tokio::test]
async fn unknown_cluster_has_no_flow_store() {
    let test = TestConfig::default();
    let mut req = request(DeleteExisting::None);
    req.cluster_id = "other".to_string();
    let err = test
        .generator()
        .generate(&req)
        .await
        .expect_err("generation must fail");
    assert!(matches!(err, crate::Error::Graph(_)));
}
