//! Build command implementation.
//!
//! `stackforge build` bakes, pushes and renders every selected service.
//! `build containers`, `build manifests` and `build metadata` run one part.

use crate::cli::args::{BuildArgs, BuildTarget};
use crate::cli::context::{Forge, ForgeOptions, Goal};
use crate::config::load_config;
use crate::error::Result;
use crate::tasks::{install_interrupt_handler, CancelToken};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, Invocation};
use super::display::show_report;

/// The build command implementation.
pub struct BuildCommand {
    invocation: Invocation,
    args: BuildArgs,
}

impl BuildCommand {
    pub fn new(invocation: Invocation, args: BuildArgs) -> Self {
        Self { invocation, args }
    }

    pub fn args(&self) -> &BuildArgs {
        &self.args
    }

    fn goal(&self) -> Option<Goal> {
        match self.args.what {
            None => Some(Goal::Build),
            Some(BuildTarget::Containers) => Some(Goal::Bake),
            Some(BuildTarget::Manifests) => Some(Goal::Manifest),
            Some(BuildTarget::Metadata) => None,
        }
    }
}

impl Command for BuildCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let mut forge = open_forge(&self.invocation, ForgeOptions::from(&self.args.target))?;
        match self.goal() {
            Some(goal) => run_goal(&mut forge, goal, self.invocation.verbose, ui),
            None => {
                let metadata = forge.metadata()?;
                ui.message(metadata.trim_end());
                Ok(CommandResult::success())
            }
        }
    }
}

/// Load the configuration and build the context, with SIGINT cancelling
/// the run.
pub(crate) fn open_forge(invocation: &Invocation, options: ForgeOptions) -> Result<Forge> {
    let config = load_config(invocation.config.as_deref(), &invocation.cwd)?;
    let cancel = CancelToken::new();
    install_interrupt_handler(&cancel);
    Ok(Forge::new(config, options, &invocation.cwd)?.with_cancel(cancel))
}

/// Run `goal`, print the report and turn the outcome into an exit code.
pub(crate) fn run_goal(
    forge: &mut Forge,
    goal: Goal,
    verbose: u8,
    ui: &mut dyn UserInterface,
) -> Result<CommandResult> {
    let outcome = forge.execute(goal)?;
    show_report(ui, &outcome, verbose > 0);
    if outcome.is_success() {
        Ok(CommandResult::success())
    } else {
        Ok(CommandResult::failure(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{Registry, SidecarInjector};
    use crate::cli::args::TargetArgs;
    use crate::config::ForgeConfig;
    use crate::deploy::{ApplyOutput, Cluster};
    use crate::secrets::Sensitive;
    use crate::template::Bindings;
    use crate::ui::MockUI;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct PresentRegistry;

    impl Registry for PresentRegistry {
        fn exists(&self, _: &str, _: &str) -> Result<bool> {
            Ok(true)
        }

        fn build(
            &self,
            _: &Path,
            _: &Path,
            _: &str,
            _: &str,
            _: &BTreeMap<String, String>,
        ) -> Result<()> {
            unreachable!("images already exist")
        }

        fn needs_push(&self, _: &str, _: &str) -> Result<bool> {
            Ok(false)
        }

        fn push(&self, _: &str, _: &str) -> Result<String> {
            unreachable!("images already pushed")
        }

        fn validate(&self) -> Result<()> {
            Ok(())
        }
    }

    struct NoCluster;

    impl Cluster for NoCluster {
        fn apply_manifests(&self, _: &Path, _: Option<&str>, _: bool) -> Result<ApplyOutput> {
            unreachable!("build never applies")
        }
    }

    struct NoInjector;

    impl SidecarInjector for NoInjector {
        fn inject(&self, _: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn forge(root: &Path) -> Forge {
        let config = ForgeConfig {
            path: root.join("forge.yaml"),
            registry: "registry.example.com".to_string(),
            namespace: "team".to_string(),
            user: "deployer".to_string(),
            password: Sensitive::new("hunter2".to_string()),
        };
        Forge::new(config, ForgeOptions::default(), root)
            .unwrap()
            .with_env(Bindings::new())
            .with_collaborators(
                Box::new(PresentRegistry),
                Box::new(NoCluster),
                Box::new(NoInjector),
            )
    }

    fn build_args(what: Option<BuildTarget>) -> BuildArgs {
        BuildArgs {
            target: TargetArgs::default(),
            what,
        }
    }

    #[test]
    fn goals_follow_subcommand() {
        let goal = |what| BuildCommand::new(Invocation::default(), build_args(what)).goal();
        assert_eq!(goal(None), Some(Goal::Build));
        assert_eq!(goal(Some(BuildTarget::Containers)), Some(Goal::Bake));
        assert_eq!(goal(Some(BuildTarget::Manifests)), Some(Goal::Manifest));
        assert_eq!(goal(Some(BuildTarget::Metadata)), None);
    }

    #[test]
    fn existing_images_are_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("api")).unwrap();
        fs::write(temp.path().join("api/service.yaml"), "name: api\n").unwrap();
        fs::write(temp.path().join("api/Dockerfile"), "FROM scratch\n").unwrap();

        let mut forge = forge(temp.path());
        let mut ui = MockUI::new();
        let result = run_goal(&mut forge, Goal::Bake, 0, &mut ui).unwrap();

        assert!(result.success);
        assert!(ui
            .messages()
            .iter()
            .any(|m| m.contains("bake: skipped, images exist")));
    }

    #[test]
    fn missing_config_is_reported() {
        let temp = TempDir::new().unwrap();
        let invocation = Invocation {
            config: Some(temp.path().join("forge.yaml")),
            ..Invocation::new(temp.path())
        };
        let cmd = BuildCommand::new(invocation, build_args(None));

        let err = cmd.execute(&mut MockUI::new()).unwrap_err();
        assert!(err.is_fatal());
    }
}
