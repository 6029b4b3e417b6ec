//! Stackforge - dependency-aware container builds and Kubernetes deploys.
//!
//! Stackforge discovers services by their `service.yaml` descriptors, orders
//! them by declared dependencies, builds and pushes their containers under
//! content-derived versions, renders their Kubernetes manifests and applies
//! them. Every unit of work runs as a task in a hierarchical task tree whose
//! report masks sensitive values.
//!
//! # Modules
//!
//! - [`build`] - Container versioning, registry access and the build stages
//! - [`cli`] - Command-line interface and the orchestration context
//! - [`config`] - `forge.yaml` loading, validation and generation
//! - [`deploy`] - Applying rendered manifests to a cluster
//! - [`error`] - Error types and result aliases
//! - [`graph`] - Service discovery and dependency ordering
//! - [`secrets`] - Sensitive values and output masking
//! - [`shell`] - External command execution
//! - [`tasks`] - The hierarchical task runtime
//! - [`template`] - `${name}` templates for descriptors and manifests
//! - [`ui`] - Terminal output and prompts
//!
//! # Example
//!
//! ```
//! use stackforge::graph::DependencyGraph;
//!
//! let graph = DependencyGraph::builder()
//!     .add_service("web", vec!["api".to_string()])
//!     .add_service("api", vec![])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.topological_order().unwrap(), ["api", "web"]);
//! ```

pub mod build;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod graph;
pub mod secrets;
pub mod shell;
pub mod tasks;
pub mod template;
pub mod ui;

pub use error::{ForgeError, Result};
