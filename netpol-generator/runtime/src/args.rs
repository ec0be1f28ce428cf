use crate::{
    cluster,
    core::{DeleteExisting, Request},
    engine::{Generator, ProtectedNamespaces},
    k8s::Cluster,
    output::{self, OutputFormat},
    snapshot::{Snapshot, SnapshotStore, Visibility},
};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tokio::time;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[clap(
    name = "netpol-generator",
    about = "Generates ingress network policies from observed traffic"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "netpol_generator=info,warn",
        env = "NETPOL_GENERATOR_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    /// The cluster to generate policies for.
    #[clap(long, env = "NETPOL_GENERATOR_CLUSTER_ID")]
    cluster_id: String,

    /// Which existing policies to replace: none, generated-only or all.
    #[clap(long, default_value = "none")]
    delete_existing: DeleteExisting,

    /// Ignores flows last seen before this RFC 3339 timestamp.
    #[clap(long)]
    network_data_since: Option<DateTime<Utc>>,

    /// Restricts which deployments get a policy, e.g.
    /// `Namespace: web+Deployment Label: app=api`.
    #[clap(long)]
    query: Option<String>,

    /// Reads deployments, namespaces, policies, flows and baselines from a
    /// YAML or JSON document.
    #[clap(long, required_unless_present = "from_cluster")]
    snapshot: Option<PathBuf>,

    /// Reads observed flows from a YAML or JSON list.
    #[clap(long, requires = "from_cluster")]
    flows: Option<PathBuf>,

    /// Reads deployments, namespaces and policies from the Kubernetes API.
    #[clap(long, conflicts_with = "snapshot")]
    from_cluster: bool,

    /// Namespaces visible to the caller. All namespaces are visible when
    /// unset.
    #[clap(long, value_delimiter = ',')]
    visible_namespaces: Option<Vec<String>>,

    /// The platform's own namespace, which never gets a generated policy.
    #[clap(long, default_value = "stackrox")]
    platform_namespace: String,

    #[clap(long, default_value = "yaml")]
    output_format: OutputFormat,

    /// Abandons generation after this many milliseconds.
    #[clap(long, default_value = "30000")]
    timeout_ms: u64,
}

impl Args {
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            cluster_id,
            delete_existing,
            network_data_since,
            query,
            snapshot,
            flows,
            from_cluster,
            visible_namespaces,
            platform_namespace,
            output_format,
            timeout_ms,
        } = self;

        log_format.try_init(log_level)?;

        let request = Request {
            cluster_id: cluster_id.clone(),
            delete_existing,
            network_data_since,
            query,
        };

        let snapshot = match snapshot {
            Some(path) if !from_cluster => Snapshot::load(&path)?,
            _ => {
                let flows = match flows {
                    Some(path) => cluster::load_flows(&path)?,
                    None => Vec::new(),
                };
                let cluster = Cluster {
                    id: cluster_id.clone(),
                    name: cluster_id,
                };
                cluster::snapshot(client.try_client().await?, cluster, flows).await?
            }
        };

        let visibility = match visible_namespaces {
            Some(namespaces) => Visibility::namespaces(namespaces),
            None => Visibility::all(),
        };
        let store = Arc::new(SnapshotStore::new(snapshot, visibility));
        let generator = Generator::new(store.clone(), store.clone(), store.clone(), store.clone())
            .with_baselines(store)
            .with_protected_namespaces(ProtectedNamespaces::new(platform_namespace));

        debug!(?request, "Generating");
        let timeout = time::Duration::from_millis(timeout_ms);
        let (generated, to_delete) = tokio::select! {
            res = time::timeout(timeout, generator.generate(&request)) => match res {
                Ok(res) => res?,
                Err(_) => bail!("generation timed out after {}ms", timeout_ms),
            },
            _ = tokio::signal::ctrl_c() => bail!("aborted"),
        };
        info!(
            generated = generated.len(),
            deleted = to_delete.len(),
            "Generated network policies"
        );

        print!("{}", output::render(output_format, &generated, to_delete)?);
        Ok(())
    }
}
