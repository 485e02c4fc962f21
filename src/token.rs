//! Cancellation token consulted when a task is dispatched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Clonable one-shot "done" flag attached to every submission.
///
/// The engine consults the token exactly once, right before invoking the
/// task closure: a token cancelled by then short-circuits the task with
/// [`TaskError::Cancelled`](crate::TaskError::Cancelled) and the closure
/// never runs. A closure that is already executing is *not* interrupted;
/// it receives a reference to the token and is responsible for its own
/// cooperative checks.
///
/// Cancellation is monotonic. There is no un-cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the token. Every clone observes the flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
