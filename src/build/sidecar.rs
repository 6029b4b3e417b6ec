//! Mesh sidecar injection.

use std::fs;
use std::path::Path;

use crate::deploy::manifest_files;
use crate::error::Result;
use crate::shell::{argv, execute, CommandOptions};

/// Rewrites rendered manifests in place to add mesh-proxy configuration.
pub trait SidecarInjector {
    fn inject(&self, manifest_dir: &Path) -> Result<()>;
}

/// [`SidecarInjector`] backed by `istioctl kube-inject`.
#[derive(Debug, Clone, Default)]
pub struct Istioctl;

impl SidecarInjector for Istioctl {
    fn inject(&self, manifest_dir: &Path) -> Result<()> {
        kube_inject("istioctl", manifest_dir)
    }
}

/// Run `<program> kube-inject -f <file>` over every manifest at or below
/// `manifest_dir`, replacing each file with the tool's stdout.
fn kube_inject(program: &str, manifest_dir: &Path) -> Result<()> {
    for file in manifest_files(manifest_dir)? {
        let path = file.to_string_lossy().into_owned();
        let cmd = argv([program, "kube-inject", "-f", path.as_str()]);
        let options = CommandOptions {
            stdout_only: true,
            ..Default::default()
        };
        let result = execute(&cmd, &options)?.check(program)?;
        fs::write(&file, result.output)?;
    }
    Ok(())
}
