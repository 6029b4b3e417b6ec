//! Generating `forge.yaml`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::secrets::Sensitive;
use crate::template::{Bindings, Interpolator, TemplateEngine};

const SETUP_TEMPLATE: &str = "\
# Global forge configuration
# DO NOT CHECK INTO VERSION CONTROL, THIS FILE CONTAINS SECRETS
docker-repo: ${docker}
user: ${user}
password: >
  ${password}
";

/// Render the contents of a new `forge.yaml`.
///
/// The password is base64 encoded, wrapped at 76 columns as a folded
/// scalar.
pub fn render_config(
    registry: &str,
    namespace: &str,
    user: &str,
    password: &Sensitive<String>,
) -> Result<String> {
    let mut bindings = Bindings::new();
    bindings.insert("docker", format!("{}/{}", registry, namespace));
    bindings.insert("user", user);
    bindings.insert(
        "password",
        password.use_for(|p| encode_wrapped(p.as_bytes())),
    );
    Interpolator.render("forge.yaml", SETUP_TEMPLATE, &bindings)
}

/// Render and write a new config file to `path`.
pub fn write_config(
    path: &Path,
    registry: &str,
    namespace: &str,
    user: &str,
    password: &Sensitive<String>,
) -> Result<()> {
    let content = render_config(registry, namespace, user, password)?;
    fs::write(path, content)?;
    Ok(())
}

fn encode_wrapped(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    encoded
        .as_bytes()
        .chunks(76)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n  ")
}
