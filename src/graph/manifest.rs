//! The `service.yaml` descriptor schema.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{ForgeError, Result};
use crate::template::{Bindings, TemplateEngine};

/// File name of a service descriptor.
pub const SERVICE_FILE: &str = "service.yaml";

/// The keys of `service.yaml` the build understands.
///
/// Any other keys are kept in the raw descriptor and exposed to manifest
/// templates as `service.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceManifest {
    /// Service name; defaults to the directory name.
    #[serde(default)]
    pub name: Option<String>,

    /// Services that must be built and deployed first.
    #[serde(default)]
    pub requires: Requires,

    /// Containers to build; defaults to every discovered Dockerfile.
    #[serde(default)]
    pub containers: Option<Vec<ContainerEntry>>,

    /// Run the sidecar injector over rendered manifests.
    #[serde(default)]
    pub istio: bool,
}

/// `requires: db` or `requires: [db, cache]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Requires {
    One(String),
    Many(Vec<String>),
}

impl Default for Requires {
    fn default() -> Self {
        Requires::Many(Vec::new())
    }
}

impl Requires {
    pub fn names(&self) -> Vec<String> {
        match self {
            Requires::One(name) => vec![name.clone()],
            Requires::Many(names) => names.clone(),
        }
    }
}

/// One entry of `containers`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ContainerEntry {
    /// Just a dockerfile path, relative to the service root.
    Dockerfile(String),
    /// A dockerfile with an explicit build context and build args.
    Detailed {
        dockerfile: String,
        #[serde(default)]
        context: Option<String>,
        #[serde(default)]
        args: BTreeMap<String, String>,
    },
}

/// A parsed descriptor: the typed view plus the raw rendered document.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub manifest: ServiceManifest,
    pub raw: Value,
}

/// Render `source` with `bindings`, then parse it as a service descriptor.
///
/// An empty document is an empty descriptor.
pub fn parse_descriptor(
    path: &Path,
    source: &str,
    engine: &dyn TemplateEngine,
    bindings: &Bindings,
) -> Result<Descriptor> {
    let invalid = |message: String| ForgeError::InvalidManifest {
        path: path.to_path_buf(),
        message,
    };

    let rendered = engine
        .render(&path.display().to_string(), source, bindings)
        .map_err(|e| invalid(e.to_string()))?;
    let raw: Value = serde_yaml::from_str(&rendered).map_err(|e| invalid(e.to_string()))?;
    let raw = match raw {
        Value::Null => Value::Mapping(Default::default()),
        Value::Mapping(_) => raw,
        _ => return Err(invalid("expected a mapping at the top level".to_string())),
    };
    let manifest: ServiceManifest =
        serde_yaml::from_value(raw.clone()).map_err(|e| invalid(e.to_string()))?;

    Ok(Descriptor { manifest, raw })
}
