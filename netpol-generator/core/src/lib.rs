//! Data model for the network policy generator.
//!
//! Everything in this crate is read-only input to, or output from, a single
//! generation pass: observed flows, deployments and namespaces visible to the
//! caller, existing network policies, and the policies the generator produces.
//! The collaborator traits in [`store`] describe how a generation pass obtains
//! its inputs; nothing here owns state across passes.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod baseline;
pub mod deployment;
pub mod flow;
pub mod labels;
pub mod namespace;
pub mod policy;
pub mod query;
pub mod request;
pub mod store;

pub use self::{
    baseline::{BaselineConnection, BaselinePeer, NetworkBaseline},
    deployment::{Deployment, Exposure, PortConfig},
    flow::{Entity, EntityType, FlowProperties, L4Protocol, NetworkFlow},
    labels::{labels_match, Selector},
    namespace::NamespaceMetadata,
    policy::{
        IngressRule, NetworkPolicy, NetworkPolicyPeer, NetworkPolicyReference, NetworkPolicySpec,
        PolicyType,
    },
    query::Query,
    request::{DeleteExisting, Request},
};

/// Label stamped on every policy this generator creates. Its presence is what
/// distinguishes generated policies from user-authored ones on later runs.
pub const GENERATED_LABEL: &str = "network-policy-generator.stackrox.io/generated";

/// Name prefix of every generated policy.
pub const GENERATED_NAME_PREFIX: &str = "stackrox-generated-";

pub const NETWORK_POLICY_API_VERSION: &str = "networking.k8s.io/v1";
