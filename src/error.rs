//! Error types for stackforge operations.
//!
//! This module defines [`ForgeError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Configuration and discovery errors are fatal: they surface before any
//!   task tree is built and end the process with a non-zero exit.
//! - External tool errors are caught at the task boundary and recorded on the
//!   task that hit them (see [`crate::tasks`]).
//! - Use `anyhow::Error` (via `ForgeError::Other`) for unexpected errors.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for stackforge operations.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Configuration file not found.
    #[error("unable to find {name}, try running `stackforge setup`")]
    ConfigNotFound { name: String },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// A required configuration key is absent.
    #[error("missing config property: {key}")]
    MissingProperty { key: String },

    /// Two service manifests declare the same name.
    #[error("duplicate service '{name}': {first} and {second}")]
    DuplicateTarget {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Service dependency cycle detected.
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// One or more required services were never discovered.
    #[error("required service(s) missing: {names}")]
    MissingDependency { names: String },

    /// A service manifest could not be parsed.
    #[error("invalid service manifest {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    /// Discovery root does not exist or is not a directory.
    #[error("not a directory: {path}")]
    NoSuchDirectory { path: PathBuf },

    /// Template rendering failed.
    #[error("template {name}: {message}")]
    Template { name: String, message: String },

    /// An external collaborator (docker, kubectl, registry) failed.
    #[error("{tool} failed: {message}")]
    ExternalTool {
        tool: String,
        message: String,
        output: String,
    },

    /// Registry credentials were rejected during setup.
    #[error("credential check failed: {message}")]
    CredentialValidation { message: String },

    /// The user interrupted the run.
    #[error("interrupted")]
    Interrupted,

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ForgeError {
    /// Build an external tool error without captured output.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            message: message.into(),
            output: String::new(),
        }
    }

    /// Configuration and discovery errors end the invocation before any
    /// task runs.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::MissingProperty { .. }
                | Self::DuplicateTarget { .. }
                | Self::CircularDependency { .. }
                | Self::MissingDependency { .. }
                | Self::InvalidManifest { .. }
                | Self::NoSuchDirectory { .. }
        )
    }

    /// The text shown to the user for this error.
    ///
    /// External tool failures include the captured tool output verbatim.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::ExternalTool { output, .. } if !output.trim().is_empty() => {
                format!("{}\n{}", self, output.trim_end())
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias for stackforge operations.
pub type Result<T> = std::result::Result<T, ForgeError>;
