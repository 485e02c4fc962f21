//! Task records and the handles callers wait on.

use crate::error::{BoxError, TaskError};
use crate::token::CancelToken;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Signature of the closures the engine schedules.
pub(crate) type TaskFn<A, R> =
    Box<dyn FnOnce(&CancelToken, A) -> Result<R, BoxError> + Send + 'static>;

/// One-shot publication cell: a worker publishes a single outcome, any
/// number of observers block until it lands.
///
/// Publication writes the slot first and broadcasts afterwards, so every
/// read through `wait` happens after the write.
struct ResultCell<R> {
    slot: Mutex<Option<Result<R, TaskError>>>,
    ready: Condvar,
}

impl<R> ResultCell<R> {
    fn new() -> Self {
        ResultCell {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn publish(&self, outcome: Result<R, TaskError>) {
        {
            let mut slot = self.slot.lock();
            debug_assert!(slot.is_none(), "task outcome published twice");
            *slot = Some(outcome);
        }
        self.ready.notify_all();
    }

    fn wait(&self) {
        let mut slot = self.slot.lock();
        while slot.is_none() {
            self.ready.wait(&mut slot);
        }
    }

    fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }
}

/// The engine's private half of a submission: everything a worker needs
/// to run the task. Lives in the engine's identity map until the task's
/// ID is popped from the queue.
pub(crate) struct TaskRecord<A, R> {
    token: CancelToken,
    func: TaskFn<A, R>,
    arg: A,
    cell: Arc<ResultCell<R>>,
}

impl<A, R> TaskRecord<A, R> {
    /// Build the record plus the caller-facing handle observing it.
    pub(crate) fn new(
        token: CancelToken,
        priority: i32,
        func: TaskFn<A, R>,
        arg: A,
    ) -> (Self, TaskHandle<R>) {
        let cell = Arc::new(ResultCell::new());
        let record = TaskRecord {
            token,
            func,
            arg,
            cell: cell.clone(),
        };
        (record, TaskHandle { priority, cell })
    }

    /// Dispatch the task: honour the cancellation token, run the closure
    /// otherwise, and publish whatever comes out. Exactly one publication
    /// happens either way.
    pub(crate) fn execute(self) {
        if self.token.is_cancelled() {
            self.cell.publish(Err(TaskError::Cancelled));
            return;
        }
        let outcome = (self.func)(&self.token, self.arg).map_err(|err| {
            // user errors go behind an Arc so every observer of the
            // handle sees the same instance
            TaskError::Failed(Arc::from(err))
        });
        self.cell.publish(outcome);
    }
}

/// Caller-facing promise for a submitted task.
///
/// Cheap to clone; all clones observe the same single publication.
pub struct TaskHandle<R> {
    priority: i32,
    cell: Arc<ResultCell<R>>,
}

impl<R> std::fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("priority", &self.priority)
            .field("finished", &self.cell.is_set())
            .finish()
    }
}

impl<R> Clone for TaskHandle<R> {
    fn clone(&self) -> Self {
        TaskHandle {
            priority: self.priority,
            cell: self.cell.clone(),
        }
    }
}

impl<R> TaskHandle<R> {
    /// Priority the task was submitted with.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Block until the task's outcome is published.
    pub fn wait(&self) {
        self.cell.wait();
    }

    /// Whether the outcome has been published yet.
    pub fn is_finished(&self) -> bool {
        self.cell.is_set()
    }
}

impl<R: Clone> TaskHandle<R> {
    /// Block until the task completes and return its outcome. Any number
    /// of callers may do this; they all observe the same pair.
    pub fn result(&self) -> Result<R, TaskError> {
        self.cell.wait();
        let slot = self.cell.slot.lock();
        match &*slot {
            Some(outcome) => outcome.clone(),
            // wait() only returns once the slot is filled
            None => unreachable!("result cell signalled ready while empty"),
        }
    }
}
