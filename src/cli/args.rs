//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Stackforge - build containers and deploy services to Kubernetes.
#[derive(Debug, Parser)]
#[command(name = "stackforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Show more detail in the report (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to forge.yaml (overrides the search from the working directory)
    #[arg(long, global = true, env = "FORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write forge.yaml interactively
    Setup,

    /// Build containers and render manifests
    Build(BuildArgs),

    /// Build, then apply manifests to the cluster
    Deploy(TargetArgs),
}

/// Options shared by `build` and `deploy`.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Kubernetes namespace to deploy into
    #[arg(short, long, global = true, env = "K8S_NAMESPACE")]
    pub namespace: Option<String>,

    /// Ask the cluster to validate without changing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Only run services whose name matches this glob
    #[arg(long, global = true, default_value = "*")]
    pub filter: String,
}

impl Default for TargetArgs {
    fn default() -> Self {
        Self {
            namespace: None,
            dry_run: false,
            filter: "*".to_string(),
        }
    }
}

/// Arguments for the `build` command.
#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(subcommand)]
    pub what: Option<BuildTarget>,
}

/// A single build goal. Without one, `build` runs every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum BuildTarget {
    /// Build containers only
    Containers,

    /// Render manifests only
    Manifests,

    /// Print the template bindings of the first service
    Metadata,
}
