//! Container builder and registry.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::Path;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::image::image_reference;
use crate::error::{ForgeError, Result};
use crate::secrets::Sensitive;
use crate::shell::{argv, execute, CommandOptions};

const MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Error document returned by the registry v2 API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    code: String,
    #[serde(default)]
    message: String,
}

/// `CODE: message` for each error in a registry error body.
fn registry_errors(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    if parsed.errors.is_empty() {
        return None;
    }
    let lines: Vec<String> = parsed
        .errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect();
    Some(lines.join("; "))
}

/// Builds images and moves them to a remote registry.
pub trait Registry {
    /// Whether `image:version` is available, locally or remotely.
    fn exists(&self, image: &str, version: &str) -> Result<bool>;

    /// Build `image:version` from a dockerfile and context directory.
    fn build(
        &self,
        context: &Path,
        dockerfile: &Path,
        image: &str,
        version: &str,
        args: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Whether `image:version` is built locally but missing remotely.
    fn needs_push(&self, image: &str, version: &str) -> Result<bool>;

    /// Push `image:version`, returning the image reference.
    fn push(&self, image: &str, version: &str) -> Result<String>;

    /// Check that the configured credentials are accepted.
    fn validate(&self) -> Result<()>;
}

/// [`Registry`] backed by the `docker` CLI and the registry v2 HTTP API.
pub struct DockerRegistry {
    registry: String,
    namespace: String,
    user: String,
    password: Sensitive<String>,
    base_url: String,
    client: Client,
    logged_in: Cell<bool>,
}

impl DockerRegistry {
    pub fn new(
        registry: impl Into<String>,
        namespace: impl Into<String>,
        user: impl Into<String>,
        password: Sensitive<String>,
    ) -> Result<Self> {
        let registry = registry.into();
        let client = Client::builder()
            .build()
            .map_err(|e| ForgeError::tool("registry", e.to_string()))?;
        Ok(Self {
            base_url: format!("https://{}", registry),
            registry,
            namespace: namespace.into(),
            user: user.into(),
            password,
            client,
            logged_in: Cell::new(false),
        })
    }

    /// Send HTTP probes to `base_url` instead of `https://<registry>`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn reference(&self, image: &str, version: &str) -> String {
        image_reference(&self.registry, &self.namespace, image, version)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        self.password
            .use_for(|password| request.basic_auth(&self.user, Some(password)))
    }

    /// Whether the registry holds a manifest for `image:version`.
    pub fn remote_exists(&self, image: &str, version: &str) -> Result<bool> {
        let url = format!(
            "{}/v2/{}/{}/manifests/{}",
            self.base_url, self.namespace, image, version
        );
        debug!("GET {}", url);
        let response = self
            .authorized(self.client.get(&url))
            .header(reqwest::header::ACCEPT, MANIFEST_V2)
            .send()
            .map_err(|e| ForgeError::tool("registry", e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().unwrap_or_default();
                let message = match registry_errors(&body) {
                    Some(errors) => format!("HTTP {} probing {} ({})", status, url, errors),
                    None => format!("HTTP {} probing {}", status, url),
                };
                Err(ForgeError::ExternalTool {
                    tool: "registry".to_string(),
                    message,
                    output: body,
                })
            }
        }
    }

    fn local_exists(&self, image: &str, version: &str) -> Result<bool> {
        let reference = self.reference(image, version);
        let cmd = argv(["docker", "image", "inspect", reference.as_str()]);
        Ok(execute(&cmd, &CommandOptions::default())?.success())
    }

    fn login(&self) -> Result<()> {
        if self.logged_in.get() {
            return Ok(());
        }
        let cmd = argv([
            "docker",
            "login",
            "--username",
            self.user.as_str(),
            "--password-stdin",
            self.registry.as_str(),
        ]);
        let options = CommandOptions {
            stdin: Some(self.password.use_for(|p| p.as_bytes().to_vec())),
            ..Default::default()
        };
        execute(&cmd, &options)?.check("docker")?;
        self.logged_in.set(true);
        Ok(())
    }
}

impl Registry for DockerRegistry {
    fn exists(&self, image: &str, version: &str) -> Result<bool> {
        Ok(self.local_exists(image, version)? || self.remote_exists(image, version)?)
    }

    fn build(
        &self,
        context: &Path,
        dockerfile: &Path,
        image: &str,
        version: &str,
        args: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut cmd = argv(["docker", "build", "-f"]);
        cmd.push(dockerfile.to_string_lossy().into_owned());
        cmd.push("-t".to_string());
        cmd.push(self.reference(image, version));
        for (key, value) in args {
            cmd.push("--build-arg".to_string());
            cmd.push(format!("{}={}", key, value));
        }
        cmd.push(context.to_string_lossy().into_owned());

        execute(&cmd, &CommandOptions::default())?.check("docker")?;
        Ok(())
    }

    fn needs_push(&self, image: &str, version: &str) -> Result<bool> {
        Ok(self.local_exists(image, version)? && !self.remote_exists(image, version)?)
    }

    fn push(&self, image: &str, version: &str) -> Result<String> {
        self.login()?;
        let reference = self.reference(image, version);
        execute(&argv(["docker", "push", reference.as_str()]), &CommandOptions::default())?
            .check("docker")?;
        Ok(reference)
    }

    fn validate(&self) -> Result<()> {
        let url = format!("{}/v2/", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .map_err(|e| ForgeError::CredentialValidation {
                message: format!("unable to reach {}: {}", self.registry, e),
            })?;
        match response.status() {
            status if status.is_success() => Ok(()),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                let mut message =
                    format!("{} rejected the credentials for {}", self.registry, self.user);
                if let Some(errors) = response.text().ok().as_deref().and_then(registry_errors) {
                    message.push_str(&format!(" ({})", errors));
                }
                debug!("credential check returned {}", status);
                Err(ForgeError::CredentialValidation { message })
            }
            status => Err(ForgeError::CredentialValidation {
                message: format!("HTTP {} from {}", status, url),
            }),
        }
    }
}
