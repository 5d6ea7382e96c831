use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::task::{Priority, TaskHarness};

struct QueuedTask {
    harness: TaskHarness,
    seq: u64,
}

impl QueuedTask {
    // Lower rank first, then arrival order within a tier.
    fn key(&self) -> (u8, u64) {
        (self.harness.priority().rank(), self.seq)
    }
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so invert: smallest key wins.
        other.key().cmp(&self.key())
    }
}

/// Priority queue of tasks waiting to run. FIFO within each priority tier.
#[derive(Default)]
pub(crate) struct PendingQueue {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
}

impl PendingQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, harness: TaskHarness) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedTask { harness, seq });
    }

    pub(crate) fn pop(&mut self) -> Option<TaskHarness> {
        self.heap.pop().map(|queued| queued.harness)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub(crate) fn contains_priority(&self, priority: Priority) -> bool {
        self.heap
            .iter()
            .any(|queued| queued.harness.priority() == priority)
    }

    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.heap.len();
        self.heap.clear();
        removed
    }
}
