#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use netpol_generator_core as core;
pub use netpol_generator_engine as engine;
pub use netpol_generator_k8s_api as k8s;

mod args;
mod cluster;
mod output;
mod snapshot;

pub use self::{
    args::Args,
    output::{Modification, OutputFormat},
    snapshot::{Snapshot, SnapshotStore, Visibility},
};
