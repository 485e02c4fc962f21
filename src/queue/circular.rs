//! Bounded circular FIFO of task IDs.

use crate::error::QueueError;
use crate::item::QItem;
use crate::queue::TaskQueue;
use parking_lot::{Condvar, Mutex};

/// Bounded ring of IDs that ignores priority entirely.
///
/// `head` is the write cursor and `tail` the read cursor, both wrapping
/// at the configured capacity. Popped items carry priority 0.
pub struct CircularQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
}

struct Inner {
    arr: Box<[u64]>,
    current_size: usize,
    head: usize,
    tail: usize,
    running: bool,
}

impl Inner {
    fn next_index(&self, index: usize) -> usize {
        if index == self.arr.len() - 1 {
            0
        } else {
            index + 1
        }
    }
}

impl CircularQueue {
    /// Create a ring holding up to `capacity` IDs.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ParamShouldBePositive);
        }
        Ok(CircularQueue {
            inner: Mutex::new(Inner {
                arr: vec![0; capacity].into_boxed_slice(),
                current_size: 0,
                head: 0,
                tail: 0,
                running: true,
            }),
            not_empty: Condvar::new(),
        })
    }
}

impl TaskQueue for CircularQueue {
    fn push(&self, item: QItem) -> Result<(), QueueError> {
        {
            let mut inner = self.inner.lock();
            if !inner.running {
                return Err(QueueError::Closed);
            }
            if inner.current_size == inner.arr.len() {
                return Err(QueueError::Full);
            }
            let head = inner.head;
            inner.arr[head] = item.id;
            inner.head = inner.next_index(head);
            inner.current_size += 1;
        }
        self.not_empty.notify_one();
        Ok(())
    }

    fn pop_wait(&self) -> Result<QItem, QueueError> {
        let mut inner = self.inner.lock();
        if !inner.running {
            return Err(QueueError::Closed);
        }
        while inner.current_size == 0 {
            self.not_empty.wait(&mut inner);
            // re-check after every wake: close broadcasts into this wait
            if !inner.running {
                return Err(QueueError::Closed);
            }
        }
        let id = inner.arr[inner.tail];
        inner.tail = inner.next_index(inner.tail);
        inner.current_size -= 1;
        Ok(QItem { id, priority: 0 })
    }

    fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.running = false;
        }
        self.not_empty.notify_all();
    }

    fn len(&self) -> usize {
        self.inner.lock().current_size
    }
}
