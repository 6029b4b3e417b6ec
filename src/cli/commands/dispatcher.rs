//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::ui::UserInterface;

use super::build::BuildCommand;
use super::deploy::DeployCommand;
use super::setup::SetupCommand;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command, writing all output through `ui`.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Settings every command that loads `forge.yaml` shares.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Directory the command was started from.
    pub cwd: PathBuf,
    /// Explicit config file.
    pub config: Option<PathBuf>,
    /// Verbosity level from `-v`.
    pub verbose: u8,
}

impl Invocation {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Default::default()
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    cwd: PathBuf,
}

impl CommandDispatcher {
    pub fn new(cwd: PathBuf) -> Self {
        Self { cwd }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Route the CLI subcommand to its implementation and execute it.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let invocation = Invocation {
            cwd: self.cwd.clone(),
            config: cli.config.clone(),
            verbose: cli.verbose,
        };
        match &cli.command {
            Commands::Setup => SetupCommand::new(&self.cwd).execute(ui),
            Commands::Build(args) => BuildCommand::new(invocation, args.clone()).execute(ui),
            Commands::Deploy(args) => DeployCommand::new(invocation, args.clone()).execute(ui),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForgeError;
    use crate::ui::MockUI;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn command_result_codes() {
        let ok = CommandResult::success();
        assert!(ok.success);
        assert_eq!(ok.exit_code, 0);

        let failed = CommandResult::failure(1);
        assert!(!failed.success);
        assert_eq!(failed.exit_code, 1);
    }

    #[test]
    fn build_without_config_is_fatal() {
        let temp = TempDir::new().unwrap();
        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf());
        let cli = Cli::try_parse_from([
            "stackforge",
            "--config",
            temp.path().join("missing.yaml").to_str().unwrap(),
            "build",
        ])
        .unwrap();

        let err = dispatcher.dispatch(&cli, &mut MockUI::new()).unwrap_err();
        assert!(matches!(err, ForgeError::ConfigNotFound { .. }));
    }
}
