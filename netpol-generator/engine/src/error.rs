/// A failed generation pass.
///
/// Each variant names the stage that failed. No partial results accompany an
/// error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("generating network graph: {0}")]
    Graph(#[source] anyhow::Error),

    #[error("obtaining existing network policies: {0}")]
    ExistingPolicies(#[source] anyhow::Error),

    #[error("parsing query: {0}")]
    Query(#[source] anyhow::Error),

    #[error("could not obtain namespaces metadata: {0}")]
    Namespaces(#[source] anyhow::Error),
}
