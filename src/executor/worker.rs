// worker thread stuff
use super::pool::Shared;
use super::task::WorkItem;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

pub type WorkerId = usize;

pub(crate) struct Worker<P> {
    pub id: WorkerId,
    shared: Arc<Shared<P>>,
}

impl<P: Ord> Worker<P> {
    pub fn new(id: WorkerId, shared: Arc<Shared<P>>) -> Self {
        Self { id, shared }
    }

    // main loop: wait -> pop -> run outside the lock, until stopped
    pub fn run(self) {
        debug!(worker = self.id, "worker started");

        while let Some(item) = self.next_item() {
            self.execute_task(item);
        }

        debug!(worker = self.id, "worker stopped");
    }

    /// Block until there is work or the pool is stopping. `None` means stop.
    ///
    /// Queued items are left in place once stopping is set.
    fn next_item(&self) -> Option<WorkItem<P>> {
        let mut state = self.shared.state.lock();
        loop {
            if state.stopping {
                return None;
            }
            if let Some(item) = state.queue.pop() {
                return Some(item);
            }
            self.shared.available.wait(&mut state);
        }
    }

    fn execute_task(&self, item: WorkItem<P>) {
        let tid = item.id;
        let start = Instant::now();
        let waited = start.duration_since(item.enqueue_time);
        self.shared.metrics.record_queue_wait(waited.as_nanos() as u64);

        trace!(worker = self.id, task = %tid, "running task");

        // result-bearing work catches its own panics; this only sees
        // panics from fire-and-forget work
        let result = self.shared.panic_handler.execute(|| item.execute());
        if result.is_err() {
            self.shared.metrics.record_task_panic();
        }

        self.shared
            .metrics
            .record_task_execution(start.elapsed().as_nanos() as u64);
    }
}
