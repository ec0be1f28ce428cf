#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Conversions between Kubernetes API resources and the generator's model.

pub mod deployment;
pub mod namespace;
pub mod policy;

pub use k8s_openapi::api::{
    self,
    apps::v1::Deployment,
    core::v1::{Namespace, Service},
    networking::v1::NetworkPolicy,
};
pub use kube::ResourceExt;

/// Identifies the cluster that converted resources belong to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cluster {
    pub id: String,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind} {name} has no namespace")]
    MissingNamespace { kind: &'static str, name: String },

    #[error("invalid {kind} {name}: {source}")]
    Invalid {
        kind: &'static str,
        name: String,
        #[source]
        source: serde_json::Error,
    },
}
