//! Sensitive values and output masking.
//!
//! - [`Sensitive`] - Wraps a credential; renders only as [`MASK`]
//! - [`OutputMasker`] - Replaces registered sensitive values in text
//!
//! # Example
//!
//! ```
//! use stackforge::secrets::{OutputMasker, Sensitive};
//!
//! let password = Sensitive::new("hunter2".to_string());
//! let mut masker = OutputMasker::new();
//! masker.add(&password);
//!
//! let line = password.use_for(|p| format!("docker login -p {}", p));
//! assert_eq!(masker.mask(&line), "docker login -p ********");
//! ```

pub mod mask;
pub mod sensitive;

pub use mask::OutputMasker;
pub use sensitive::{Sensitive, MASK};

pub(crate) use sensitive::SensitiveRef;
