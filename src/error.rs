//! Error types shared by the queues and the engine.

use std::error::Error;
use std::sync::Arc;

/// Boxed error produced by user task closures.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Errors surfaced by queue operations.
///
/// Push fails fast so producers learn about saturation immediately; pop
/// only ever fails because the queue was closed underneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// A constructor was handed a zero size limit or priority count.
    #[error("size limit and priority count must be positive")]
    ParamShouldBePositive,
    /// A push carried a priority outside the queue's configured `[0, N)`.
    #[error("priority is outside the configured range")]
    PriorityOutOfRange,
    /// Bounded queue at capacity. Better to fail fast than to look down.
    #[error("queue is full, rejecting new item")]
    Full,
    /// The queue is closed; nothing succeeds any more.
    #[error("queue is already closed, can't accept new request")]
    Closed,
}

/// Errors surfaced by engine construction and submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("number of workers should be positive")]
    NumWorkersNotPositive,
    #[error("this engine is already closed")]
    AlreadyClosed,
    /// The queue rejected the submission's item.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Terminal outcome of a task that did not produce a value.
///
/// The user error is held behind an `Arc` so every observer of a task
/// handle sees the same error instance.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// The cancellation token was already signalled when a worker took
    /// the task; the closure never ran.
    #[error("context is already cancelled when it is gonna be taken")]
    Cancelled,
    /// The closure ran and returned this error.
    #[error("{0}")]
    Failed(Arc<dyn Error + Send + Sync + 'static>),
}

impl TaskError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}

/// Report a broken internal invariant and abort the process.
///
/// The queues and the engine registry share bookkeeping that must stay
/// consistent (occupancy counters, the ID-to-task map). Once they
/// disagree there is no state to recover to, and a panic inside a worker
/// thread would die silently, so this path never unwinds.
pub(crate) fn fatal(msg: &str) -> ! {
    eprintln!("prioriq: fatal: {msg}");
    std::process::abort();
}
