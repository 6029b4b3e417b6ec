//! The sensitive value wrapper.

use std::fmt;
use std::sync::Arc;

/// The fixed text rendered in place of any sensitive value.
pub const MASK: &str = "********";

/// A credential-like value that can be handed to external calls but is
/// never rendered.
///
/// Cloning shares the underlying allocation, so every stage that receives
/// the credential holds the same canonical value ([`Sensitive::ptr_eq`]).
/// `Debug` and `Display` both print [`MASK`].
///
/// # Example
///
/// ```
/// use stackforge::secrets::{Sensitive, MASK};
///
/// let password = Sensitive::new("hunter2".to_string());
/// assert_eq!(format!("{}", password), MASK);
/// assert!(!format!("{:?}", password).contains("hunter2"));
///
/// let len = password.use_for(|p| p.len());
/// assert_eq!(len, 7);
/// ```
pub struct Sensitive<T = String> {
    inner: Arc<T>,
}

impl<T> Sensitive<T> {
    /// Wrap a value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Borrow the underlying value for an external call.
    pub fn use_for<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner)
    }

    /// Whether two handles refer to the same wrapped value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: AsRef<str> + Send + Sync + 'static> Sensitive<T> {
    /// Type-erased reference used by the masker and the task tree.
    pub(crate) fn as_ref_handle(&self) -> SensitiveRef {
        SensitiveRef {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Clone for Sensitive<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PartialEq> PartialEq for Sensitive<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Eq> Eq for Sensitive<T> {}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sensitive({})", MASK)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

/// A sensitive string held by reference, independent of the wrapped type.
#[derive(Clone)]
pub(crate) struct SensitiveRef {
    inner: Arc<dyn AsRef<str> + Send + Sync>,
}

impl SensitiveRef {
    pub(crate) fn text(&self) -> &str {
        (*self.inner).as_ref()
    }

    pub(crate) fn same_value(&self, other: &SensitiveRef) -> bool {
        // Compare data pointers only; vtable pointers may differ.
        std::ptr::eq(
            Arc::as_ptr(&self.inner) as *const u8,
            Arc::as_ptr(&other.inner) as *const u8,
        )
    }
}

impl fmt::Debug for SensitiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveRef({})", MASK)
    }
}
