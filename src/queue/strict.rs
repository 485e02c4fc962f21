//! Strict multi-queue priority queue.

use crate::error::{fatal, QueueError};
use crate::item::QItem;
use crate::queue::{SegmentedQueue, TaskQueue};
use parking_lot::{Condvar, Mutex};

/// Bounded priority queue over a fixed set of priority classes `[0, N)`
/// that always pops from the highest non-empty class.
///
/// Each class gets its own unbounded [`SegmentedQueue`] substrate,
/// created on first use, plus an occupancy counter kept outside the
/// substrate so the pop-side scan touches one small array instead of N
/// queues. There is no starvation handling; a steady stream of pushes
/// into a high class keeps the lower classes waiting.
pub struct StrictPriorityQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    num_priorities: usize,
}

struct Inner {
    counts: Vec<usize>,
    subs: Vec<Option<SegmentedQueue>>,
    size: usize,
    size_limit: usize,
    running: bool,
}

impl StrictPriorityQueue {
    /// Create a queue capped at `size_limit` items across
    /// `num_priorities` classes.
    pub fn new(size_limit: usize, num_priorities: usize) -> Result<Self, QueueError> {
        if size_limit == 0 || num_priorities == 0 {
            return Err(QueueError::ParamShouldBePositive);
        }
        Ok(StrictPriorityQueue {
            inner: Mutex::new(Inner {
                counts: vec![0; num_priorities],
                subs: (0..num_priorities).map(|_| None).collect(),
                size: 0,
                size_limit,
                running: true,
            }),
            not_empty: Condvar::new(),
            num_priorities,
        })
    }
}

impl TaskQueue for StrictPriorityQueue {
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
        // size > 0 guarantees a non-empty class below
        let class = match (0..self.num_priorities).rev().find(|&i| inner.counts[i] > 0) {
            Some(class) => class,
            None => fatal("strict queue: positive size with all classes empty"),
        };
        // counts[class] > 0, so this pop returns without waiting; a
        // racing close surfaces as Closed and the counters stay untouched
        let popped = match &inner.subs[class] {
            Some(substrate) => substrate.pop_wait()?,
            None => fatal("strict queue: occupied class has no substrate"),
        };
        inner.counts[class] -= 1;
        inner.size -= 1;
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn rejects_non_positive_construction() {
        assert_eq!(
            StrictPriorityQueue::new(0, 16).err(),
            Some(QueueError::ParamShouldBePositive)
        );
        assert_eq!(
            StrictPriorityQueue::new(2048, 0).err(),
            Some(QueueError::ParamShouldBePositive)
        );
    }

    #[test]
    fn higher_class_always_wins() {
        // two items at 13 overtake the earlier push at 8
        let queue = StrictPriorityQueue::new(2048, 16).unwrap();
        queue.push(QItem::new(1, 8)).unwrap();
        queue.push(QItem::new(2, 13)).unwrap();
        queue.push(QItem::new(3, 13)).unwrap();

        let order: Vec<(u64, i32)> = (0..3)
            .map(|_| {
                let item = queue.pop_wait().unwrap();
                (item.id, item.priority)
            })
            .collect();
        assert_eq!(order, vec![(2, 13), (3, 13), (1, 8)]);
    }

    #[test]
    fn same_class_is_fifo() {
        let queue = StrictPriorityQueue::new(2048, 4).unwrap();
        for id in 1..=5 {
            queue.push(QItem::new(id, 2)).unwrap();
        }
        for expected in 1..=5 {
            assert_eq!(queue.pop_wait().unwrap().id, expected);
        }
    }

    #[test]
    fn rejects_out_of_range_priorities() {
        let queue = StrictPriorityQueue::new(2048, 16).unwrap();
        assert_eq!(
            queue.push(QItem::new(1, -1)),
            Err(QueueError::PriorityOutOfRange)
        );
        assert_eq!(
            queue.push(QItem::new(1, 16)),
            Err(QueueError::PriorityOutOfRange)
        );
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn size_limit_is_enforced_across_classes() {
        let queue = StrictPriorityQueue::new(2048, 16).unwrap();
        for id in 0..2048u64 {
            queue.push(QItem::new(id, (id % 16) as i32)).unwrap();
        }
        assert_eq!(
            queue.push(QItem::new(2048, 1)),
            Err(QueueError::Full)
        );
        queue.pop_wait().unwrap();
        queue.push(QItem::new(2048, 1)).unwrap();
    }

    #[test]
    fn blocked_pop_wakes_on_push() {
        let queue = Arc::new(StrictPriorityQueue::new(100, 16).unwrap());
        let popper = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop_wait())
        };
        thread::sleep(Duration::from_millis(50));
        queue.push(QItem::new(9, 10)).unwrap();
        let item = popper.join().unwrap().unwrap();
        assert_eq!((item.id, item.priority), (9, 10));
    }

    #[test]
    fn close_semantics() {
        let queue = Arc::new(StrictPriorityQueue::new(2000, 8).unwrap());
        let popper = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop_wait())
        };
        thread::sleep(Duration::from_millis(50));
        queue.close();
        assert_eq!(popper.join().unwrap(), Err(QueueError::Closed));
        assert_eq!(queue.push(QItem::new(0, 0)), Err(QueueError::Closed));
        assert_eq!(queue.pop_wait().unwrap_err(), QueueError::Closed);
        queue.close();
    }
}
