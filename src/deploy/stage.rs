//! Applying rendered manifests.

use std::path::{Path, PathBuf};

use super::cluster::Cluster;
use crate::tasks::{TaskContext, TaskFailure, TaskHandle};

/// Outcome of one apply invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    pub manifest_dir: PathBuf,
    pub command: Vec<String>,
    pub exit_code: i32,
    pub output: String,
    pub dry_run: bool,
}

impl DeployResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// `<command> -> OK` or `<command> -> ERR[<code>]`, followed by the
    /// captured output.
    pub fn summary(&self) -> String {
        let status = if self.succeeded() {
            "OK".to_string()
        } else {
            format!("ERR[{}]", self.exit_code)
        };
        format!(
            "{} -> {}\n{}",
            self.command.join(" "),
            status,
            self.output.trim_end()
        )
    }
}

/// Applies a service's manifests to the configured namespace.
pub struct DeployStage<'a> {
    cluster: &'a dyn Cluster,
    namespace: Option<String>,
    dry_run: bool,
}

impl<'a> DeployStage<'a> {
    pub fn new(cluster: &'a dyn Cluster, namespace: Option<String>, dry_run: bool) -> Self {
        Self {
            cluster,
            namespace,
            dry_run,
        }
    }

    /// Run the apply as a `deploy` task under `cx`.
    ///
    /// A non-zero exit makes the task an error whose message is the same
    /// summary text.
    pub fn deploy(&self, cx: &mut TaskContext<'_>, manifest_dir: &Path) -> TaskHandle<DeployResult> {
        cx.spawn("deploy", |cx| {
            if self.dry_run {
                cx.status(&format!("dry run of {}", manifest_dir.display()));
            } else {
                cx.status(&format!("applying {}", manifest_dir.display()));
            }
            let applied =
                self.cluster
                    .apply_manifests(manifest_dir, self.namespace.as_deref(), self.dry_run)?;

            let result = DeployResult {
                manifest_dir: manifest_dir.to_path_buf(),
                command: applied.command,
                exit_code: applied.exit_code,
                output: applied.output,
                dry_run: self.dry_run,
            };
            let summary = result.summary();
            cx.summarize(summary.clone());
            if result.succeeded() {
                Ok(result)
            } else {
                Err(TaskFailure::reported(summary))
            }
        })
    }
}
