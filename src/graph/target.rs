//! Discovered services and their containers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::manifest::{ContainerEntry, ServiceManifest};

/// One independently buildable and deployable service.
#[derive(Debug, Clone)]
pub struct Target {
    pub(crate) name: String,
    pub(crate) descriptor: PathBuf,
    pub(crate) manifest: ServiceManifest,
    pub(crate) raw: Value,
    /// Dockerfiles found below the root, relative to it.
    pub(crate) dockerfiles: Vec<String>,
    /// Every non-ignored file below the root, relative to it.
    pub(crate) files: Vec<String>,
}

impl Target {
    pub(crate) fn new(descriptor: PathBuf, manifest: ServiceManifest, raw: Value) -> Self {
        let name = manifest.name.clone().unwrap_or_else(|| {
            descriptor
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        Self {
            name,
            descriptor,
            manifest,
            raw,
            dockerfiles: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the `service.yaml` this target came from.
    pub fn descriptor(&self) -> &Path {
        &self.descriptor
    }

    /// The directory holding the descriptor.
    pub fn root(&self) -> &Path {
        self.descriptor.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn requires(&self) -> Vec<String> {
        self.manifest.requires.names()
    }

    pub fn istio(&self) -> bool {
        self.manifest.istio
    }

    pub fn dockerfiles(&self) -> &[String] {
        &self.dockerfiles
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// The rendered descriptor with `name` filled in.
    pub fn info(&self) -> Value {
        let mut info = self.raw.clone();
        if let Value::Mapping(map) = &mut info {
            let key = Value::String("name".to_string());
            if !map.contains_key(&key) {
                map.insert(key, Value::String(self.name.clone()));
            }
        }
        info
    }

    /// Containers declared in the descriptor, or one per discovered
    /// Dockerfile.
    pub fn containers(&self) -> Vec<Container> {
        match &self.manifest.containers {
            Some(entries) => entries.iter().map(Container::from_entry).collect(),
            None => self
                .dockerfiles
                .iter()
                .map(|d| Container::new(d.clone(), None, BTreeMap::new()))
                .collect(),
        }
    }
}

/// A container image built from a dockerfile in a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Dockerfile path relative to the service root.
    pub dockerfile: String,
    /// Build context relative to the service root.
    pub context: String,
    pub args: BTreeMap<String, String>,
}

impl Container {
    pub fn new(dockerfile: String, context: Option<String>, args: BTreeMap<String, String>) -> Self {
        let context = context.unwrap_or_else(|| {
            Path::new(&dockerfile)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        Self {
            dockerfile,
            context,
            args,
        }
    }

    fn from_entry(entry: &ContainerEntry) -> Self {
        match entry {
            ContainerEntry::Dockerfile(path) => Self::new(path.clone(), None, BTreeMap::new()),
            ContainerEntry::Detailed {
                dockerfile,
                context,
                args,
            } => Self::new(dockerfile.clone(), context.clone(), args.clone()),
        }
    }

    pub fn abs_dockerfile(&self, root: &Path) -> PathBuf {
        root.join(&self.dockerfile)
    }

    pub fn abs_context(&self, root: &Path) -> PathBuf {
        if self.context.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&self.context)
        }
    }
}
