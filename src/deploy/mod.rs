//! Deploying rendered manifests.
//!
//! - [`Cluster`] - The apply tool; [`Kubectl`] shells out to `kubectl`
//! - [`DeployStage`] - Runs the apply as a task and summarizes it

pub mod cluster;
pub mod stage;

pub use cluster::{manifest_files, read_resources, ApplyOutput, Cluster, Kubectl, ResourceDescriptor};
pub use stage::{DeployResult, DeployStage};
