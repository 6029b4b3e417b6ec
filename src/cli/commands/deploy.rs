//! Deploy command implementation.

use crate::cli::args::TargetArgs;
use crate::cli::context::{ForgeOptions, Goal};
use crate::error::Result;
use crate::ui::UserInterface;

use super::build::{open_forge, run_goal};
use super::dispatcher::{Command, CommandResult, Invocation};

/// Builds every selected service, then applies its manifests.
pub struct DeployCommand {
    invocation: Invocation,
    args: TargetArgs,
}

impl DeployCommand {
    pub fn new(invocation: Invocation, args: TargetArgs) -> Self {
        Self { invocation, args }
    }
}

impl Command for DeployCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let mut forge = open_forge(&self.invocation, ForgeOptions::from(&self.args))?;
        if self.args.dry_run {
            ui.message("dry run: the cluster will not be changed");
        }
        run_goal(&mut forge, Goal::Deploy, self.invocation.verbose, ui)
    }
}
