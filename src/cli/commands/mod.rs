//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results. Commands are
//! routed by [`CommandDispatcher`].

pub mod build;
pub mod deploy;
pub mod dispatcher;
pub mod display;
pub mod setup;

pub use build::BuildCommand;
pub use deploy::DeployCommand;
pub use dispatcher::{Command, CommandDispatcher, CommandResult, Invocation};
pub use setup::{Credentials, SetupCommand};
