//! Cooperative cancellation shared between the driving thread and workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cheaply cloneable cancel flag. One writer side (Ctrl-C handler, stdin
/// command loop, or a test) flips it; loops poll it at chunk boundaries.
///
/// Cancellation is a request, not preemption: an in-flight page query
/// finishes before the poll notices the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; late calls are harmless.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Arm this token on Ctrl-C. Returns an error if a handler is already
    /// installed for the process.
    pub fn hook_ctrlc(&self) -> Result<(), ctrlc::Error> {
        let flag = Arc::clone(&self.flag);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
    }
}
