use crate::executor::WorkItem;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;

struct Entry<P>(WorkItem<P>);

impl<P: Ord> PartialEq for Entry<P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl<P: Ord> Eq for Entry<P> {}

impl<P: Ord> PartialOrd for Entry<P> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<P: Ord> Ord for Entry<P> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // max-heap: higher priority first, then lower seq (earlier submission)
        self.0
            .priority
            .cmp(&other.0.priority)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

/// Max-heap of work items ordered by priority.
///
/// Items of equal priority pop in the order they were submitted. Not
/// synchronized; the pool guards it with its own mutex.
pub(crate) struct PriorityQueue<P> {
    heap: BinaryHeap<Entry<P>>,
}

impl<P: Ord> PriorityQueue<P> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, item: WorkItem<P>) {
        self.heap.push(Entry(item));
    }

    pub fn pop(&mut self) -> Option<WorkItem<P>> {
        self.heap.pop().map(|e| e.0)
    }

    pub fn peek_priority(&self) -> Option<&P> {
        self.heap.peek().map(|e| &e.0.priority)
    }
}

impl<P> PriorityQueue<P> {
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Take every queued item, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<WorkItem<P>> {
        self.heap.drain().map(|e| e.0).collect()
    }
}
