//! In-process task prioritization: pluggable blocking priority queues
//! feeding a fixed pool of worker threads.
//!
//! Callers submit closures tagged with a numeric priority; workers pull
//! the next task according to the policy of the queue the engine was
//! built with: strict priority, a starvation-preventing round-robin
//! sweep, a max-heap, or plain FIFO. The queues carry only 64-bit task
//! IDs; the engine maps IDs back to live task records at dispatch time.

pub mod engine;
pub mod error;
pub mod item;
pub mod queue;
mod segment_pool;
pub mod task;
pub mod threading;
pub mod token;

pub use engine::{Engine, EngineBuilder};
pub use error::{BoxError, EngineError, QueueError, TaskError};
pub use item::{QItem, MIN_QITEM};
pub use queue::{
    CircularQueue, HeapPriorityQueue, RoundRobinQueue, SegmentedQueue, StrictPriorityQueue,
    TaskQueue,
};
pub use task::TaskHandle;
pub use threading::WorkerPriority;
pub use token::CancelToken;
