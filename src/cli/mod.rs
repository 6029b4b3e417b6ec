//! Command-line interface for stackforge.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`context`] - The [`Forge`] orchestration context of one invocation
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;
pub mod context;

pub use args::{BuildArgs, BuildTarget, Cli, Commands, TargetArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
pub use context::{Forge, ForgeOptions, Goal};
