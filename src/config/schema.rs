//! Configuration schema types.
//!
//! [`ConfigFile`] mirrors `forge.yaml` exactly; [`ForgeConfig`] is the
//! validated form the rest of the crate uses.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::secrets::Sensitive;

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "forge.yaml";

/// Raw `forge.yaml` contents.
///
/// # Example
///
/// ```yaml
/// docker-repo: registry.example.com/team
/// user: deployer
/// password: >
///   aHVudGVyMg==
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigFile {
    /// `<registry>/<namespace>`. Required.
    #[serde(default)]
    pub docker_repo: Option<String>,

    /// Registry user. Required.
    #[serde(default)]
    pub user: Option<String>,

    /// Base64-encoded registry password. Required.
    #[serde(default)]
    pub password: Option<String>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// The file this was loaded from.
    pub path: PathBuf,

    /// Registry host, e.g. `registry.hub.docker.com`.
    pub registry: String,

    /// Registry namespace (organization).
    pub namespace: String,

    pub user: String,

    /// Decoded password. Cloning shares the one allocation.
    pub password: Sensitive<String>,
}

impl ForgeConfig {
    /// Directory holding the config file; also scanned for services.
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// `<registry>/<namespace>`, as written in `docker-repo`.
    pub fn docker_repo(&self) -> String {
        format!("{}/{}", self.registry, self.namespace)
    }
}
