//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared flag telling the runtime to stop spawning tasks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

static INTERRUPT_TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Cancel `token` on the first SIGINT.
///
/// A second SIGINT gets the default disposition and terminates the process.
/// Only the first installed token is used.
#[cfg(unix)]
pub fn install_interrupt_handler(token: &CancelToken) {
    extern "C" fn on_interrupt(_signal: libc::c_int) {
        if let Some(token) = INTERRUPT_TOKEN.get() {
            token.cancel();
        }
        unsafe {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
        }
    }

    if INTERRUPT_TOKEN.set(token.clone()).is_err() {
        return;
    }
    let handler: extern "C" fn(libc::c_int) = on_interrupt;
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
pub fn install_interrupt_handler(token: &CancelToken) {
    let _ = INTERRUPT_TOKEN.set(token.clone());
}
