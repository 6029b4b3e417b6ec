//! Setup command implementation.
//!
//! `stackforge setup` checks that kubectl can reach a cluster, asks for
//! registry credentials until the registry accepts them, and writes
//! `forge.yaml` in the working directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::build::{DockerRegistry, Registry};
use crate::config::{write_config, CONFIG_FILE};
use crate::error::{ForgeError, Result};
use crate::secrets::Sensitive;
use crate::shell::{argv, execute, CommandOptions};
use crate::ui::{Prompt, UserInterface};

use super::dispatcher::{Command, CommandResult};

/// Registry user meaning "the password is a JSON key file".
const JSON_KEY_USER: &str = "_json_key";

const DEFAULT_REGISTRY: &str = "registry.hub.docker.com";

/// Credentials collected from the user.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub registry: String,
    pub namespace: String,
    pub user: String,
    pub password: Sensitive<String>,
}

type CredentialCheck = Box<dyn Fn(&Credentials) -> Result<()>>;

/// The setup command implementation.
pub struct SetupCommand {
    dir: PathBuf,
    checks: Vec<Vec<String>>,
    validate: CredentialCheck,
}

impl SetupCommand {
    /// A setup writing to `dir`, validating against the real registry.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            checks: vec![
                argv(["kubectl", "version", "--client"]),
                argv([
                    "kubectl",
                    "get",
                    "service",
                    "kubernetes",
                    "--namespace",
                    "default",
                ]),
            ],
            validate: Box::new(|creds: &Credentials| {
                DockerRegistry::new(
                    creds.registry.clone(),
                    creds.namespace.clone(),
                    creds.user.clone(),
                    creds.password.clone(),
                )?
                .validate()
            }),
        }
    }

    /// Commands that must succeed before credentials are asked for.
    pub fn with_checks(mut self, checks: Vec<Vec<String>>) -> Self {
        self.checks = checks;
        self
    }

    pub fn with_validator(
        mut self,
        validate: impl Fn(&Credentials) -> Result<()> + 'static,
    ) -> Self {
        self.validate = Box::new(validate);
        self
    }

    fn check_cluster(&self, ui: &mut dyn UserInterface) -> bool {
        ui.message("== Checking Kubernetes Setup ==");
        for check in &self.checks {
            let output = match execute(check, &CommandOptions::default()) {
                Ok(result) if result.success() => continue,
                Ok(result) => result.output,
                Err(e) => e.diagnostic(),
            };
            warn!("`{}` failed: {}", check.join(" "), output.trim_end());
            ui.error(&format!(
                "== Kubernetes Check Failed ==\n\n{}\n\n\
                 Please make sure kubectl is installed/configured correctly.",
                output.trim_end()
            ));
            return false;
        }
        true
    }

    fn ask(
        &self,
        ui: &mut dyn UserInterface,
        previous: Option<&Credentials>,
    ) -> Result<Credentials> {
        let registry = ui.prompt(
            &Prompt::input("registry", "Docker registry").with_default(
                previous.map_or(DEFAULT_REGISTRY.to_string(), |c| c.registry.clone()),
            ),
        )?;
        let default_user = previous
            .map(|c| c.user.clone())
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_default();
        let user = ui.prompt(&Prompt::input("user", "Docker user").with_default(default_user))?;
        let namespace = ui.prompt(
            &Prompt::input("organization", "Docker organization").with_default(user.clone()),
        )?;

        let password = if user == JSON_KEY_USER {
            let path = ui.prompt(&Prompt::input("json-key", "Path to json key"))?;
            fs::read_to_string(path.trim())?
        } else {
            ui.prompt(&Prompt::password("password", "Docker password"))?
        };

        Ok(Credentials {
            registry: registry.trim().to_string(),
            namespace: namespace.trim().to_string(),
            user: user.trim().to_string(),
            password: Sensitive::new(password),
        })
    }
}

impl Command for SetupCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        if !self.check_cluster(ui) {
            return Ok(CommandResult::failure(1));
        }

        ui.message("== Setting up Docker ==");
        let mut previous: Option<Credentials> = None;
        let creds = loop {
            let creds = match self.ask(ui, previous.as_ref()) {
                Ok(creds) => creds,
                Err(ForgeError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    ui.error(&format!("unable to read json key: {}", e));
                    ui.error("-- please try again --");
                    continue;
                }
                Err(e) => return Err(e),
            };
            match (self.validate)(&creds) {
                Ok(()) => break creds,
                Err(e @ ForgeError::CredentialValidation { .. })
                | Err(e @ ForgeError::ExternalTool { .. }) => {
                    ui.error(&e.to_string());
                    ui.error("-- please try again --");
                    previous = Some(creds);
                }
                Err(e) => return Err(e),
            }
        };

        let path = self.dir.join(CONFIG_FILE);
        ui.message(&format!("== Writing config to {} ==", path.display()));
        write_config(
            &path,
            &creds.registry,
            &creds.namespace,
            &creds.user,
            &creds.password,
        )?;
        ui.success("== Done ==");
        Ok(CommandResult::success())
    }
}
