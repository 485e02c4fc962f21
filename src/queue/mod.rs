//! Queue variants and the contract they share.
//!
//! Push and pop have asymmetric semantics on purpose: push fails fast so
//! producers learn about saturation right away, while pop waits so
//! workers park until there is something to run. Every variant follows
//! the same discipline internally, one mutex plus one condition variable,
//! with waiters re-checking both "non-empty" and "closed" after every
//! wake.

mod circular;
mod heap;
mod round_robin;
mod segmented;
mod strict;

pub use circular::CircularQueue;
pub use heap::HeapPriorityQueue;
pub use round_robin::RoundRobinQueue;
pub use segmented::SegmentedQueue;
pub use strict::StrictPriorityQueue;

use crate::error::QueueError;
use crate::item::QItem;

/// Contract every queue variant implements. The engine schedules against
/// this trait, so embedders can plug in custom queueing policies.
///
/// Implementations must be thread-safe: any number of producer threads
/// and worker threads hit the same queue concurrently.
pub trait TaskQueue: Send + Sync {
    /// Insert an item, failing fast with [`QueueError::Full`],
    /// [`QueueError::Closed`] or [`QueueError::PriorityOutOfRange`].
    fn push(&self, item: QItem) -> Result<(), QueueError>;

    /// Remove the next item according to the queue's policy, blocking
    /// while the queue is empty. The only error is [`QueueError::Closed`],
    /// reported whether the queue was closed at entry or while waiting.
    fn pop_wait(&self) -> Result<QItem, QueueError>;

    /// Stop accepting operations and wake every blocked `pop_wait`.
    /// Closing twice has no effect beyond the first call.
    fn close(&self);

    /// Number of items currently queued.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
