use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parameters of a single generation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub cluster_id: String,
    #[serde(default)]
    pub delete_existing: DeleteExisting,
    /// Only flows seen at or after this time are considered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_data_since: Option<DateTime<Utc>>,
    /// Restricts which deployments get a policy, in [`Query`](crate::Query)
    /// syntax.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Which existing policies are replaced by a generation pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeleteExisting {
    /// Keep every existing policy.
    #[default]
    None,
    /// Delete policies previously created by the generator.
    GeneratedOnly,
    /// Delete every existing policy.
    All,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid delete-existing mode: {0:?}")]
pub struct InvalidDeleteMode(String);

// === impl DeleteExisting ===

impl std::str::FromStr for DeleteExisting {
    type Err = InvalidDeleteMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "NONE" => Ok(Self::None),
            "generated-only" | "GENERATED_ONLY" => Ok(Self::GeneratedOnly),
            "all" | "ALL" => Ok(Self::All),
            s => Err(InvalidDeleteMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for DeleteExisting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => "none".fmt(f),
            Self::GeneratedOnly => "generated-only".fmt(f),
            Self::All => "all".fmt(f),
        }
    }
}
