//! Service discovery and dependency ordering.
//!
//! - [`Discovery`] - Walks a source tree for `service.yaml` descriptors
//! - [`Target`] / [`Container`] - A discovered service and its images
//! - [`DependencyGraph`] - `requires` edges and topological ordering

pub mod dependency;
pub mod discovery;
pub mod manifest;
pub mod target;

pub use dependency::{DependencyGraph, DependencyGraphBuilder};
pub use discovery::{find_parent_containing, Discovery};
pub use manifest::{ContainerEntry, Requires, ServiceManifest, SERVICE_FILE};
pub use target::{Container, Target};
