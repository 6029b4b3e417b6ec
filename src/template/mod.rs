//! Template rendering with `${variable}` interpolation.
//!
//! Used for deployment manifests, service descriptors and the generated
//! configuration file.
//!
//! # Syntax
//!
//! - `${name}` - replaced with the bound value; names may be dotted
//!   (`${service.name}`, `${build.images.Dockerfile}`)
//! - `$${escaped}` - produces literal `${escaped}` in output
//!
//! # Example
//!
//! ```
//! use stackforge::template::{Bindings, Interpolator, TemplateEngine};
//!
//! let mut vars = Bindings::new();
//! vars.insert("service.name", "api");
//! let text = Interpolator.render("deploy.yaml", "name: ${service.name}", &vars).unwrap();
//! assert_eq!(text, "name: api");
//! ```

pub mod bindings;
pub mod interpolation;

pub use bindings::Bindings;
pub use interpolation::{extract_variables, parse_interpolation, Segment};

use crate::error::{ForgeError, Result};

/// Renders template text against a set of bindings.
pub trait TemplateEngine {
    /// Render `source`; `name` identifies the template in errors.
    fn render(&self, name: &str, source: &str, bindings: &Bindings) -> Result<String>;
}

/// The built-in `${...}` engine. Unbound variables are an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpolator;

impl TemplateEngine for Interpolator {
    fn render(&self, name: &str, source: &str, bindings: &Bindings) -> Result<String> {
        let mut result = String::with_capacity(source.len());
        for segment in parse_interpolation(source) {
            match segment {
                Segment::Literal(text) => result.push_str(&text),
                Segment::Variable(var) => {
                    let value = bindings.get(&var).ok_or_else(|| ForgeError::Template {
                        name: name.to_string(),
                        message: format!("unresolved variable: ${{{}}}", var),
                    })?;
                    result.push_str(value);
                }
            }
        }
        Ok(result)
    }
}
