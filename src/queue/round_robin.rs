//! Round-robin multi-queue priority queue with starvation prevention.

use crate::error::{fatal, QueueError};
use crate::item::QItem;
use crate::queue::{SegmentedQueue, TaskQueue};
use parking_lot::{Condvar, Mutex};

/// Bounded priority queue over classes `[0, N)` that sweeps through the
/// non-empty classes instead of always serving the highest.
///
/// The sweep starts at the class of the first item pushed into an empty
/// queue, walks leftward (toward lower classes), and on reaching the
/// bottom wraps back to the top and walks leftward again, down to and
/// including the class it last served. Items within one class are FIFO.
/// An item pushed into a class the sweep has already left this round
/// waits for the next full sweep, so equal-priority work is effectively
/// prioritized last.
///
/// This bounds the wait of lower classes as long as the higher classes
/// are not a firehose; with every class saturated it degrades into a
/// plain rotation.
pub struct RoundRobinQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    num_priorities: usize,
}

struct Inner {
    counts: Vec<usize>,
    subs: Vec<Option<SegmentedQueue>>,
    size: usize,
    size_limit: usize,
    /// Class the next pop is served from; `None` exactly while empty.
    cursor: Option<usize>,
    running: bool,
}

impl Inner {
    /// Two-pass sweep for the class after serving `class`: first walk
    /// `class-1 ..= 0`, then wrap and walk `N-1 ..= class`.
    fn next_cursor(&self, class: usize) -> Option<usize> {
        (0..class)
            .rev()
            .find(|&i| self.counts[i] > 0)
            .or_else(|| (class..self.counts.len()).rev().find(|&i| self.counts[i] > 0))
    }
}

impl RoundRobinQueue {
    /// Create a queue capped at `size_limit` items across
    /// `num_priorities` classes.
    pub fn new(size_limit: usize, num_priorities: usize) -> Result<Self, QueueError> {
        if size_limit == 0 || num_priorities == 0 {
            return Err(QueueError::ParamShouldBePositive);
        }
        Ok(RoundRobinQueue {
            inner: Mutex::new(Inner {
                counts: vec![0; num_priorities],
                subs: (0..num_priorities).map(|_| None).collect(),
                size: 0,
                size_limit,
                cursor: None,
                running: true,
            }),
            not_empty: Condvar::new(),
            num_priorities,
        })
    }
}

impl TaskQueue for RoundRobinQueue {
    fn push(&self, item: QItem) -> Result<(), QueueError> {
        if item.priority < 0 || item.priority as usize >= self.num_priorities {
            return Err(QueueError::PriorityOutOfRange);
        }
        let class = item.priority as usize;
        {
            let mut inner = self.inner.lock();
            if !inner.running {
                return Err(QueueError::Closed);
            }
            if inner.size == inner.size_limit {
                return Err(QueueError::Full);
            }
            // the substrate is unbounded, so with the queue open this
            // push cannot fail; propagate Closed from a race all the same
            inner.subs[class]
                .get_or_insert_with(SegmentedQueue::new)
                .push(item)?;
            // first item after empty bootstraps the sweep position
            if inner.size == 0 {
                inner.cursor = Some(class);
            }
            inner.counts[class] += 1;
            inner.size += 1;
        }
        self.not_empty.notify_one();
        Ok(())
    }

    fn pop_wait(&self) -> Result<QItem, QueueError> {
        let mut inner = self.inner.lock();
        if !inner.running {
            return Err(QueueError::Closed);
        }
        while inner.size == 0 {
            self.not_empty.wait(&mut inner);
            // re-check after every wake: close broadcasts into this wait
            if !inner.running {
                return Err(QueueError::Closed);
            }
        }
        let class = match inner.cursor {
            Some(class) => class,
            None => fatal("round-robin queue: positive size without a cursor"),
        };
        // counts[class] > 0, so this pop returns without waiting; a
        // racing close surfaces as Closed and the counters stay untouched
        let popped = match &inner.subs[class] {
            Some(substrate) => substrate.pop_wait()?,
            None => fatal("round-robin queue: cursor points at a missing substrate"),
        };
        inner.counts[class] -= 1;
        inner.size -= 1;
        inner.cursor = if inner.size == 0 {
            None
        } else {
            match inner.next_cursor(class) {
                Some(next) => Some(next),
                None => fatal("round-robin queue: positive size with all classes empty"),
            }
        };
        Ok(QItem {
            id: popped.id,
            priority: class as i32,
        })
    }

    fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.running = false;
            // close substrates after flipping the flag so a worker that
            // unblocks inside one observes a consistent shutdown
            for substrate in inner.subs.iter().flatten() {
                substrate.close();
            }
        }
        self.not_empty.notify_all();
    }

    fn len(&self) -> usize {
        self.inner.lock().size
    }
}
