use crate::{
    core::{NetworkPolicy, NetworkPolicyReference},
    k8s,
};
use anyhow::{bail, Context, Result};
use serde::Serialize;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Multi-document manifests, ready for `kubectl apply`.
    #[default]
    Yaml,
    /// A single [`Modification`] object.
    Json,
}

/// The changes a generation pass proposes for a cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Modification {
    pub apply_yaml: String,
    pub to_delete: Vec<NetworkPolicyReference>,
}

// === impl OutputFormat ===

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "yaml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            s => bail!("invalid output format: {}", s),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yaml => "yaml".fmt(f),
            Self::Json => "json".fmt(f),
        }
    }
}

// === impl Modification ===

impl Modification {
    pub fn new(generated: &[NetworkPolicy], to_delete: Vec<NetworkPolicyReference>) -> Result<Self> {
        Ok(Self {
            apply_yaml: render_yaml(generated)?,
            to_delete,
        })
    }
}

/// Renders policies as a `---`-separated stream of Kubernetes manifests.
pub fn render_yaml(policies: &[NetworkPolicy]) -> Result<String> {
    let mut out = String::new();
    for policy in policies {
        let np = k8s::policy::to_k8s(policy)?;
        let doc = serde_yaml::to_string(&np)
            .with_context(|| format!("rendering {}/{}", policy.namespace, policy.name))?;
        out.push_str("---\n");
        out.push_str(&doc);
    }
    Ok(out)
}

pub(crate) fn render(
    format: OutputFormat,
    generated: &[NetworkPolicy],
    to_delete: Vec<NetworkPolicyReference>,
) -> Result<String> {
    match format {
        OutputFormat::Yaml => {
            let mut out = String::new();
            for r in &to_delete {
                out.push_str(&format!("# delete: {}/{}\n", r.namespace, r.name));
            }
            out.push_str(&render_yaml(generated)?);
            Ok(out)
        }
        OutputFormat::Json => {
            let modification = Modification::new(generated, to_delete)?;
            serde_json::to_string_pretty(&modification).context("rendering modification")
        }
    }
}
