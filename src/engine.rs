//! The prioritization engine: a worker pool over a pluggable queue.
//!
//! Three parts: the queue, the worker threads, and the identity map.
//! Submission registers a task record under a fresh 64-bit ID and pushes
//! only the `(id, priority)` pair into the queue; a worker pops the pair,
//! detaches the record from the map, and runs it. Keeping the queues
//! ID-only keeps their element type trivially copyable and lets the same
//! queues serve embedders that schedule something other than closures.

use crate::error::{fatal, BoxError, EngineError};
use crate::item::QItem;
use crate::queue::TaskQueue;
use crate::task::{TaskHandle, TaskRecord};
use crate::threading::{apply_worker_priority, WorkerPriority};
use crate::token::CancelToken;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

/// State guarded by the engine lock: the monotonic ID counter and the
/// map from queued IDs to live task records.
struct Registry<A, R> {
    last_id: u64,
    tasks: HashMap<u64, TaskRecord<A, R>>,
}

/// Worker-pool scheduler generic over the task argument and result
/// payloads; the engine never inspects either.
///
/// Workers block inside the queue's `pop_wait` between tasks. Closing
/// the engine disconnects the shutdown latch and closes the queue, which
/// unblocks every parked worker; in-flight closures run to completion.
pub struct Engine<A, R> {
    queue: Arc<dyn TaskQueue>,
    registry: Arc<Mutex<Registry<A, R>>>,
    /// Disconnects when the sender below is dropped; workers and the
    /// submit path both probe it.
    shutdown: Receiver<()>,
    /// Taken (and thereby dropped) by the first `close`.
    shutdown_guard: Mutex<Option<Sender<()>>>,
}

/// Configuration for [`Engine`] construction beyond the worker count.
pub struct EngineBuilder {
    workers: usize,
    thread_name: String,
    os_priority: Option<WorkerPriority>,
}

impl EngineBuilder {
    pub fn new(workers: usize) -> Self {
        EngineBuilder {
            workers,
            thread_name: "prioriq-worker".to_string(),
            os_priority: None,
        }
    }

    /// Prefix for worker thread names; the worker index is appended.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Ask each worker thread to apply an OS scheduling level on start.
    pub fn os_priority(mut self, level: WorkerPriority) -> Self {
        self.os_priority = Some(level);
        self
    }

    /// Spawn the workers and hand back the engine.
    pub fn build<A, R>(self, queue: Arc<dyn TaskQueue>) -> Result<Engine<A, R>, EngineError>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        if self.workers == 0 {
            return Err(EngineError::NumWorkersNotPositive);
        }
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let registry = Arc::new(Mutex::new(Registry {
            last_id: 0,
            tasks: HashMap::new(),
        }));
        for idx in 0..self.workers {
            let queue = queue.clone();
            let registry = registry.clone();
            let shutdown = shutdown_rx.clone();
            let os_priority = self.os_priority;
            thread::Builder::new()
                .name(format!("{}-{idx}", self.thread_name))
                .spawn(move || {
                    if let Some(level) = os_priority {
                        apply_worker_priority(level);
                    }
                    work_loop(queue, registry, shutdown);
                })
                .expect("failed to spawn engine worker thread");
        }
        Ok(Engine {
            queue,
            registry,
            shutdown: shutdown_rx,
            shutdown_guard: Mutex::new(Some(shutdown_tx)),
        })
    }
}

fn work_loop<A, R>(
    queue: Arc<dyn TaskQueue>,
    registry: Arc<Mutex<Registry<A, R>>>,
    shutdown: Receiver<()>,
) {
    loop {
        // the latch may have fired while this worker was busy running a
        // task; a worker parked in pop_wait is unblocked by the queue
        // close instead
        if let Err(TryRecvError::Disconnected) = shutdown.try_recv() {
            return;
        }
        let item = match queue.pop_wait() {
            Ok(item) => item,
            Err(_) => return,
        };
        let record = {
            let mut registry = registry.lock();
            match registry.tasks.remove(&item.id) {
                Some(record) => record,
                // an ID in the queue without a record means the
                // submit-side ordering broke; bookkeeping is gone
                None => fatal("engine: popped an ID with no task in the registry"),
            }
        };
        record.execute();
    }
}

impl<A, R> Engine<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    /// Create an engine with `workers` threads scheduling against
    /// `queue`. Use [`EngineBuilder`] for the remaining knobs.
    pub fn new(queue: Arc<dyn TaskQueue>, workers: usize) -> Result<Self, EngineError> {
        EngineBuilder::new(workers).build(queue)
    }

    /// Queue `func` for execution at `priority`, returning a handle the
    /// caller can wait on.
    ///
    /// Fails with [`EngineError::AlreadyClosed`] after [`close`], and
    /// propagates the queue's push errors (a bounded queue at capacity
    /// rejects the submission here, consistently with the map
    /// registration).
    ///
    /// [`close`]: Engine::close
    pub fn submit<F>(
        &self,
        token: CancelToken,
        priority: i32,
        func: F,
        arg: A,
    ) -> Result<TaskHandle<R>, EngineError>
    where
        F: FnOnce(&CancelToken, A) -> Result<R, BoxError> + Send + 'static,
    {
        if let Err(TryRecvError::Disconnected) = self.shutdown.try_recv() {
            return Err(EngineError::AlreadyClosed);
        }
        let mut registry = self.registry.lock();
        // increment first; a failed push below loses at most this one ID
        // out of 2^64
        registry.last_id += 1;
        let id = registry.last_id;
        // register before pushing so a worker can never pop an ID whose
        // record is missing
        let (record, handle) = TaskRecord::new(token, priority, Box::new(func), arg);
        registry.tasks.insert(id, record);
        if let Err(err) = self.queue.push(QItem { id, priority }) {
            registry.tasks.remove(&id);
            return Err(EngineError::Queue(err));
        }
        Ok(handle)
    }

    /// Shut the engine down: subsequent submissions are rejected and
    /// workers exit once the queue reports closed. Does not wait for
    /// closures already running. Closing twice is a no-op.
    pub fn close(&self) {
        // dropping the sender disconnects the latch for every receiver
        self.shutdown_guard.lock().take();
        self.queue.close();
    }

    /// Number of tasks registered but not yet taken by a worker.
    pub fn pending(&self) -> usize {
        self.registry.lock().tasks.len()
    }
}
