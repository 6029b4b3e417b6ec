//! Output masking for sensitive values.

use super::sensitive::{Sensitive, SensitiveRef, MASK};

/// Replaces every registered sensitive value with [`MASK`].
///
/// # Example
///
/// ```
/// use stackforge::secrets::{OutputMasker, Sensitive};
///
/// let token = Sensitive::new("super-secret-value".to_string());
/// let mut masker = OutputMasker::new();
/// masker.add(&token);
///
/// let output = masker.mask("The key is super-secret-value here");
/// assert_eq!(output, "The key is ******** here");
/// ```
#[derive(Debug, Default)]
pub struct OutputMasker {
    secrets: Vec<SensitiveRef>,
}

impl OutputMasker {
    /// Create a masker with no registered values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sensitive value to be masked.
    pub fn add<T: AsRef<str> + Send + Sync + 'static>(&mut self, value: &Sensitive<T>) {
        self.add_ref(value.as_ref_handle());
    }

    /// Register a type-erased sensitive reference.
    ///
    /// Empty values and values already registered are ignored.
    pub(crate) fn add_ref(&mut self, value: SensitiveRef) {
        if value.text().is_empty() || self.secrets.iter().any(|s| s.same_value(&value)) {
            return;
        }
        self.secrets.push(value);
        // Longest first, so a secret that contains another is replaced whole.
        self.secrets
            .sort_by_key(|s| std::cmp::Reverse(s.text().len()));
    }

    /// Mask any sensitive values in the given string.
    pub fn mask(&self, input: &str) -> String {
        let mut result = input.to_string();
        for secret in &self.secrets {
            result = result.replace(secret.text(), MASK);
        }
        result
    }

    /// Get the number of registered values.
    pub fn secret_count(&self) -> usize {
        self.secrets.len()
    }
}
