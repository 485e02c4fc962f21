//! Process-wide pool of fixed-capacity ID segments.
//!
//! Segments are 256-slot `u64` slabs (2 KiB each) recycled between every
//! segmented queue in the process. A segment's cursors only move forward;
//! once the pop cursor reaches capacity the segment is retired by its
//! queue and returned here with both cursors reset. The pool keeps a
//! small stash of idle segments and drops the surplus, so a burst of
//! queued work does not pin memory forever.

use parking_lot::Mutex;
use std::sync::OnceLock;

/// IDs per segment. 256 × 8 bytes keeps one segment at 2 KiB.
pub(crate) const SEGMENT_CAPACITY: usize = 256;

/// Idle segments retained for reuse.
const MAX_POOLED: usize = 32;

static POOL: OnceLock<Mutex<Vec<Segment>>> = OnceLock::new();

fn pool() -> &'static Mutex<Vec<Segment>> {
    POOL.get_or_init(|| Mutex::new(Vec::with_capacity(MAX_POOLED)))
}

/// Bounded one-way slab of IDs. Not circular: `head` (next write) and
/// `tail` (next read) only advance, so FIFO order survives the slab
/// filling up. A slab whose read cursor reaches capacity is spent and
/// goes back to the pool.
///
/// Not thread-safe on its own; the owning queue's lock serializes access.
#[derive(Debug)]
pub(crate) struct Segment {
    arr: Box<[u64; SEGMENT_CAPACITY]>,
    head: usize,
    tail: usize,
}

impl Segment {
    fn new() -> Self {
        Segment {
            arr: Box::new([0; SEGMENT_CAPACITY]),
            head: 0,
            tail: 0,
        }
    }

    pub(crate) fn can_push(&self) -> bool {
        self.head < SEGMENT_CAPACITY
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tail == self.head
    }

    /// Every slot has been written and read; the segment is spent.
    pub(crate) fn exhausted(&self) -> bool {
        self.tail == SEGMENT_CAPACITY
    }

    /// Append `id`, or report that the write cursor is at capacity.
    pub(crate) fn push(&mut self, id: u64) -> bool {
        if !self.can_push() {
            return false;
        }
        self.arr[self.head] = id;
        self.head += 1;
        true
    }

    /// Take the oldest unread ID, if any.
    pub(crate) fn pop(&mut self) -> Option<u64> {
        if self.is_empty() {
            return None;
        }
        let id = self.arr[self.tail];
        self.tail += 1;
        Some(id)
    }
}

/// Take a segment from the pool, or allocate a fresh one.
pub(crate) fn acquire() -> Segment {
    pool().lock().pop().unwrap_or_else(Segment::new)
}

/// Return a spent segment with its cursors reset. Beyond the stash cap
/// the segment is dropped instead.
pub(crate) fn release(mut segment: Segment) {
    segment.head = 0;
    segment.tail = 0;
    let mut guard = pool().lock();
    if guard.len() < MAX_POOLED {
        guard.push(segment);
    }
}
