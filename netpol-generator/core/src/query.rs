//! Structured deployment queries.
//!
//! A query is a conjunction of clauses. Each clause names a field and a set of
//! accepted values; a clause matches when the field equals any of its values.
//! The textual form separates clauses with `+` and values with `,`:
//!
//! ```text
//! Namespace: frontend,backend+Deployment Label: tier=web
//! ```

use crate::{deployment::Deployment, namespace::NamespaceMetadata};
use std::{fmt, str::FromStr};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    clauses: Vec<Clause>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clause {
    field: Field,
    values: Vec<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    ClusterId,
    Cluster,
    Namespace,
    Deployment,
    DeploymentId,
    /// Matches a `key=value` pod label.
    DeploymentLabel,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueryParseError {
    #[error("clause {0:?} is missing a ':' separator")]
    MissingSeparator(String),
    #[error("unknown field {0:?}")]
    UnknownField(String),
    #[error("field {0:?} has no values")]
    NoValues(String),
    #[error("label value {0:?} must have the form key=value")]
    InvalidLabel(String),
}

// === impl Query ===

impl Query {
    pub fn cluster_id(id: impl Into<String>) -> Self {
        Self::matching(Field::ClusterId, Some(id.into()))
    }

    pub fn matching(field: Field, values: impl IntoIterator<Item = String>) -> Self {
        Self {
            clauses: vec![Clause {
                field,
                values: values.into_iter().collect(),
            }],
        }
    }

    /// Returns the conjunction of both queries.
    pub fn and(mut self, other: Query) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn matches_deployment(&self, deployment: &Deployment) -> bool {
        self.clauses.iter().all(|c| c.matches_deployment(deployment))
    }

    /// Clauses on deployment-only fields do not constrain namespaces.
    pub fn matches_namespace(&self, namespace: &NamespaceMetadata) -> bool {
        self.clauses.iter().all(|c| c.matches_namespace(namespace))
    }
}

impl FromStr for Query {
    type Err = QueryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut clauses = Vec::new();
        for clause in s.split('+') {
            if clause.trim().is_empty() {
                continue;
            }
            clauses.push(clause.parse()?);
        }
        Ok(Self { clauses })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                "+".fmt(f)?;
            }
            write!(f, "{}: {}", clause.field, clause.values.join(","))?;
        }
        Ok(())
    }
}

// === impl Clause ===

impl Clause {
    pub fn field(&self) -> Field {
        self.field
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    fn matches_deployment(&self, d: &Deployment) -> bool {
        match self.field {
            Field::ClusterId => self.contains(&d.cluster_id),
            Field::Cluster => self.contains(&d.cluster_name),
            Field::Namespace => self.contains(&d.namespace),
            Field::Deployment => self.contains(&d.name),
            Field::DeploymentId => self.contains(&d.id),
            Field::DeploymentLabel => self.values.iter().any(|v| match v.split_once('=') {
                Some((key, value)) => d.pod_labels.get(key).map(String::as_str) == Some(value),
                None => false,
            }),
        }
    }

    fn matches_namespace(&self, ns: &NamespaceMetadata) -> bool {
        match self.field {
            Field::ClusterId => self.contains(&ns.cluster_id),
            Field::Cluster => self.contains(&ns.cluster_name),
            Field::Namespace => self.contains(&ns.name),
            Field::Deployment | Field::DeploymentId | Field::DeploymentLabel => true,
        }
    }

    fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

impl FromStr for Clause {
    type Err = QueryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, values) = s
            .split_once(':')
            .ok_or_else(|| QueryParseError::MissingSeparator(s.trim().to_string()))?;
        let field = field.parse::<Field>()?;
        let values = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        if values.is_empty() {
            return Err(QueryParseError::NoValues(field.to_string()));
        }
        if field == Field::DeploymentLabel {
            if let Some(invalid) = values.iter().find(|v| !v.contains('=')) {
                return Err(QueryParseError::InvalidLabel(invalid.clone()));
            }
        }
        Ok(Self { field, values })
    }
}

// === impl Field ===

impl FromStr for Field {
    type Err = QueryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cluster id" => Ok(Self::ClusterId),
            "cluster" => Ok(Self::Cluster),
            "namespace" => Ok(Self::Namespace),
            "deployment" => Ok(Self::Deployment),
            "deployment id" => Ok(Self::DeploymentId),
            "deployment label" => Ok(Self::DeploymentLabel),
            _ => Err(QueryParseError::UnknownField(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClusterId => "Cluster ID".fmt(f),
            Self::Cluster => "Cluster".fmt(f),
            Self::Namespace => "Namespace".fmt(f),
            Self::Deployment => "Deployment".fmt(f),
            Self::DeploymentId => "Deployment ID".fmt(f),
            Self::DeploymentLabel => "Deployment Label".fmt(f),
        }
    }
}
