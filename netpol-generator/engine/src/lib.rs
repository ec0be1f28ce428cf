//! Network Policy Generator
//!
//! The generator synthesizes least-privilege ingress `NetworkPolicy` objects for the deployments of
//! a cluster from the traffic observed between them. One generation pass proceeds as follows:
//!
//! - Observed flows are folded into a directed graph keyed by [`Entity`]. Deployments visible to
//!   the caller are attached to their nodes; a node without a deployment is a *masked* peer.
//! - Existing policies are split into those kept and those to be deleted, according to the
//!   request's [`DeleteExisting`] mode.
//! - For every visible, selected, unprotected deployment, an ingress rule is synthesized from its
//!   incoming edges and exposure, and wrapped into a policy unless a kept user policy already
//!   selects exactly the same pods.
//!
//! ```text
//! [ Flows ] -> [ Graph ] <- [ Deployments ]
//!                 |
//!                 v
//!        [ Ingress rule ] -> [ Policy ] <- [ Kept policies ]
//! ```
//!
//! Rule synthesis prefers availability over precision whenever the graph cannot bound the set of
//! legitimate sources: traffic from outside the cluster admits every source, and a masked peer
//! admits every pod in every namespace.
//!
//! [`Entity`]: netpol_generator_core::Entity
//! [`DeleteExisting`]: netpol_generator_core::DeleteExisting

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod assemble;
mod error;
mod generator;
pub mod graph;
pub mod ingress;
mod protected;
pub mod reconcile;

#[cfg(test)]
mod tests;

pub use self::{
    assemble::generate_policy,
    error::Error,
    generator::Generator,
    graph::{Graph, Node, NodeId},
    ingress::ingress_rule,
    protected::ProtectedNamespaces,
    reconcile::{reconcile, ExistingPolicies},
};
