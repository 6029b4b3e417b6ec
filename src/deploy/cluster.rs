//! Cluster apply tool.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{ForgeError, Result};
use crate::shell::{argv, execute, CommandOptions};

/// What an apply invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutput {
    pub command: Vec<String>,
    pub exit_code: i32,
    /// Combined stdout and stderr, verbatim.
    pub output: String,
}

/// A resource declared in a rendered manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub kind: String,
    pub name: String,
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.to_lowercase(), self.name)
    }
}

/// Applies manifests to a cluster.
pub trait Cluster {
    /// Apply every manifest at or below `dir`. A non-zero exit is reported
    /// in the output, not as an error.
    fn apply_manifests(
        &self,
        dir: &Path,
        namespace: Option<&str>,
        dry_run: bool,
    ) -> Result<ApplyOutput>;

    /// Resources declared by the manifests in `dir`.
    fn list_resources(&self, dir: &Path) -> Result<Vec<ResourceDescriptor>> {
        read_resources(dir)
    }
}

/// [`Cluster`] backed by `kubectl`.
#[derive(Debug, Clone, Default)]
pub struct Kubectl;

impl Kubectl {
    pub fn apply_command(dir: &Path, namespace: Option<&str>, dry_run: bool) -> Vec<String> {
        let mut cmd = argv(["kubectl", "apply"]);
        if let Some(namespace) = namespace {
            cmd.push("--namespace".to_string());
            cmd.push(namespace.to_string());
        }
        if dry_run {
            cmd.push("--dry-run=client".to_string());
        }
        cmd.push("--recursive".to_string());
        cmd.push("-f".to_string());
        cmd.push(dir.to_string_lossy().into_owned());
        cmd
    }
}

impl Cluster for Kubectl {
    fn apply_manifests(
        &self,
        dir: &Path,
        namespace: Option<&str>,
        dry_run: bool,
    ) -> Result<ApplyOutput> {
        let cmd = Self::apply_command(dir, namespace, dry_run);
        let result = execute(&cmd, &CommandOptions::default())?;
        Ok(ApplyOutput {
            exit_code: result.code(),
            command: result.command,
            output: result.output,
        })
    }
}

#[derive(Deserialize)]
struct ResourceHeader {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    metadata: Option<Metadata>,
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Deserialize)]
struct Metadata {
    #[serde(default)]
    name: Option<String>,
}

/// Parse the `kind` and `metadata.name` of every document in every YAML
/// file below `dir`, in file name order. `List` resources contribute their
/// items.
pub fn read_resources(dir: &Path) -> Result<Vec<ResourceDescriptor>> {
    let mut resources = Vec::new();
    for file in manifest_files(dir)? {
        let text = fs::read_to_string(&file)?;
        for document in serde_yaml::Deserializer::from_str(&text) {
            let value = Value::deserialize(document).map_err(|e| ForgeError::InvalidManifest {
                path: file.clone(),
                message: e.to_string(),
            })?;
            push_resources(value, &mut resources);
        }
    }
    Ok(resources)
}

fn push_resources(value: Value, out: &mut Vec<ResourceDescriptor>) {
    if value.is_null() {
        return;
    }
    let Ok(header) = serde_yaml::from_value::<ResourceHeader>(value) else {
        return;
    };
    if header.kind.as_deref() == Some("List") {
        for item in header.items {
            push_resources(item, out);
        }
        return;
    }
    if let (Some(kind), Some(name)) = (header.kind, header.metadata.and_then(|m| m.name)) {
        out.push(ResourceDescriptor { kind, name });
    }
}

/// Every `.yaml`/`.yml` file at or below `dir`, sorted by path.
pub fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_manifests(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_manifests(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_manifests(&path, out)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml")
        {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn apply_command_flags() {
        let cmd = Kubectl::apply_command(Path::new("/out/api"), Some("staging"), true);
        assert_eq!(
            cmd,
            vec![
                "kubectl",
                "apply",
                "--namespace",
                "staging",
                "--dry-run=client",
                "--recursive",
                "-f",
                "/out/api"
            ]
        );

        let plain = Kubectl::apply_command(Path::new("/out/api"), None, false);
        assert_eq!(plain, vec!["kubectl", "apply", "--recursive", "-f", "/out/api"]);
    }

    #[test]
    fn reads_resources_from_multi_document_files() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("deploy.yaml"),
            "kind: Deployment\nmetadata:\n  name: api\n---\nkind: Service\nmetadata:\n  name: api\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("extra.yml"),
            "kind: List\nitems:\n  - kind: ConfigMap\n    metadata:\n      name: api-config\n",
        )
        .unwrap();
        fs::write(temp.path().join("README.md"), "kind: Ignored\n").unwrap();

        let resources = read_resources(temp.path()).unwrap();
        let shown: Vec<String> = resources.iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["deployment/api", "service/api", "configmap/api-config"]);
    }

    #[test]
    fn nested_manifests_are_listed() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("top.yaml"), "kind: Service\nmetadata:\n  name: top\n").unwrap();
        fs::write(
            temp.path().join("sub/x.yaml"),
            "kind: Deployment\nmetadata:\n  name: db\n",
        )
        .unwrap();

        let files = manifest_files(temp.path()).unwrap();
        assert_eq!(files, vec![temp.path().join("sub/x.yaml"), temp.path().join("top.yaml")]);
        let shown: Vec<String> = read_resources(temp.path())
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(shown, vec!["deployment/db", "service/top"]);
    }

    #[test]
    fn documents_without_kind_are_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.yaml"), "---\nfoo: bar\n---\n").unwrap();
        assert!(read_resources(temp.path()).unwrap().is_empty());
    }
}
