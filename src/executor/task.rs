//! Task representation and execution.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Named priority levels.
///
/// Usable as the pool's priority type: `ThreadPool::<Priority>::new(4)`.
/// Greater is more urgent, so `Realtime` pops before `Background`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Priority {
    Background = 0,
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Realtime = 4,
}

/// A queued unit of work: a priority plus a type-erased closure.
///
/// `seq` is assigned under the pool lock and breaks ties between equal
/// priorities in submission order.
pub(crate) struct WorkItem<P> {
    pub(crate) id: TaskId,
    pub(crate) priority: P,
    pub(crate) seq: u64,
    pub(crate) func: Box<dyn FnOnce() + Send + 'static>,
    pub(crate) enqueue_time: Instant,
}

impl<P> WorkItem<P> {
    pub fn new<F>(priority: P, seq: u64, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        WorkItem {
            id: TaskId::next(),
            priority,
            seq,
            func: Box::new(f),
            enqueue_time: Instant::now(),
        }
    }

    /// Execute the task
    pub fn execute(self) {
        (self.func)();
    }
}

impl<P: fmt::Debug> fmt::Debug for WorkItem<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .field("enqueue_time", &self.enqueue_time)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Realtime > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert!(Priority::Low > Priority::Background);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_task_ids_are_unique() {
        let a = WorkItem::new(0, 0, || {});
        let b = WorkItem::new(0, 1, || {});
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_execute_runs_closure_once() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let item = WorkItem::new(Priority::High, 0, move || {
            flag.store(true, Ordering::SeqCst);
        });

        item.execute();
        assert!(ran.load(Ordering::SeqCst));
    }
}
