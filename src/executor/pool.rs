use super::handle::{channel, TaskHandle};
use super::panic_handler::{PanicHandler, PanicInfo};
use super::task::WorkItem;
use super::worker::{Worker, WorkerId};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::scheduler::PriorityQueue;
use crate::telemetry::{Metrics, MetricsSnapshot};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error, info, warn};

/// Queue and stop flag, guarded together by one mutex.
pub(crate) struct QueueState<P> {
    pub(crate) queue: PriorityQueue<P>,
    pub(crate) stopping: bool,
    next_seq: u64,
}

/// State shared between the pool handle and every worker.
pub(crate) struct Shared<P> {
    pub(crate) state: Mutex<QueueState<P>>,
    pub(crate) available: Condvar,
    pub(crate) panic_handler: PanicHandler,
    pub(crate) metrics: Arc<Metrics>,
}

struct WorkerHandle {
    id: WorkerId,
    thread: JoinHandle<()>,
}

/// A fixed set of worker threads executing closures in priority order.
///
/// `P` is the priority type; greater values run first and equal priorities
/// run in submission order. Wrap a key in [`std::cmp::Reverse`] to make
/// smaller values more urgent.
///
/// # Shutdown
///
/// [`shutdown`](Self::shutdown) (also run on drop) lets tasks that are already
/// running finish, then joins every worker. Tasks still queued at that point
/// never run: they are dropped and their handles resolve to
/// [`Error::Abandoned`]. Submissions after shutdown fail with
/// [`Error::ShutDown`].
pub struct ThreadPool<P = i32> {
    shared: Arc<Shared<P>>,
    // held for the whole join so concurrent shutdowns wait for each other
    workers: Mutex<Vec<WorkerHandle>>,
    worker_ids: Vec<ThreadId>,
    num_threads: usize,
}

impl<P> ThreadPool<P>
where
    P: Ord + Send + 'static,
{
    pub fn with_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let num_threads = config.worker_threads();
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                queue: PriorityQueue::new(),
                stopping: false,
                next_seq: 0,
            }),
            available: Condvar::new(),
            panic_handler: PanicHandler::new(config.panic_strategy),
            metrics: Arc::new(Metrics::new()),
        });

        let mut handles = Vec::with_capacity(num_threads);

        for id in 0..num_threads {
            let worker = Worker::new(id, shared.clone());
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);

            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            match builder.spawn(move || worker.run()) {
                Ok(thread) => handles.push(WorkerHandle { id, thread }),
                Err(e) => {
                    error!(worker = id, error = %e, "failed to spawn worker");
                    stop_and_join(&shared, handles);
                    return Err(Error::executor(format!("spawn failed: {}", e)));
                }
            }
        }

        debug!(num_threads, "thread pool started");

        let worker_ids = handles.iter().map(|h| h.thread.thread().id()).collect();

        Ok(Self {
            shared,
            workers: Mutex::new(handles),
            worker_ids,
            num_threads,
        })
    }

    /// Pool with exactly `num_threads` workers and default settings otherwise.
    pub fn new(num_threads: usize) -> Result<Self> {
        let config = Config::builder().num_threads(num_threads).build()?;
        Self::with_config(&config)
    }

    /// Queue `f` at `priority` and return a handle to its result.
    ///
    /// A panic inside `f` is caught and reported through the handle.
    pub fn submit_with_priority<F, R>(&self, priority: P, f: F) -> Result<TaskHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (completer, handle) = channel();
        let metrics = self.shared.metrics.clone();

        self.enqueue(priority, move || {
            let outcome = catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
                metrics.record_task_panic();
                PanicInfo::from_payload(payload)
            });
            completer.complete(outcome);
        })?;

        Ok(handle)
    }

    /// Queue `f` at `priority` without a result handle.
    ///
    /// Nothing observes the outcome; a panic is handled by the pool's
    /// [`PanicStrategy`](super::PanicStrategy).
    pub fn execute_with_priority<F>(&self, priority: P, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(priority, f)
    }

    fn enqueue<F>(&self, priority: P, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.shared.state.lock();
            if state.stopping {
                drop(state);
                self.shared.metrics.record_task_rejected();
                warn!("submission rejected, pool is shut down");
                return Err(Error::ShutDown);
            }

            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.push(WorkItem::new(priority, seq, f));
        }

        self.shared.metrics.record_task_submitted();
        self.shared.available.notify_one();
        Ok(())
    }
}

impl<P> ThreadPool<P>
where
    P: Ord + Default + Send + 'static,
{
    /// Pool sized to the host's available parallelism.
    pub fn with_default_threads() -> Result<Self> {
        Self::with_config(&Config::default())
    }

    /// [`submit_with_priority`](Self::submit_with_priority) at `P::default()`.
    pub fn submit<F, R>(&self, f: F) -> Result<TaskHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.submit_with_priority(P::default(), f)
    }

    /// [`execute_with_priority`](Self::execute_with_priority) at `P::default()`.
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.execute_with_priority(P::default(), f)
    }
}

impl<P> ThreadPool<P> {
    /// Stop the pool and join its workers.
    ///
    /// Running tasks finish first; queued tasks are dropped without running.
    /// Safe to call more than once, and from several threads at once: every
    /// caller returns only after all workers have stopped.
    ///
    /// Called from one of the pool's own workers, this stops the pool but
    /// returns without joining anything, since that worker cannot join itself.
    /// A later call from another thread, or dropping the pool, joins them all.
    pub fn shutdown(&self) {
        let abandoned = {
            let mut state = self.shared.state.lock();
            if !state.stopping {
                info!(queued = state.queue.len(), "shutting down thread pool");
            }
            state.stopping = true;
            if state.queue.is_empty() {
                Vec::new()
            } else {
                state.queue.drain()
            }
        };

        self.shared.available.notify_all();

        if !abandoned.is_empty() {
            debug!(count = abandoned.len(), "dropping queued tasks");
            self.shared
                .metrics
                .record_tasks_abandoned(abandoned.len() as u64);
            // drops the completers, resolving their handles
            drop(abandoned);
        }

        if self.worker_ids.contains(&thread::current().id()) {
            debug!("shutdown called from a worker, leaving the join to another thread");
            return;
        }

        let mut workers = self.workers.lock();
        join_workers(workers.drain(..));
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.state.lock().stopping
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Priority of the task a worker would take next, if any is queued.
    pub fn peek_priority(&self) -> Option<P>
    where
        P: Ord + Clone,
    {
        self.shared.state.lock().queue.peek_priority().cloned()
    }

    /// Number of tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Panics from [`execute`](Self::execute)-style work only. Panics caught
    /// into a [`TaskHandle`] are reported there; `metrics().tasks_panicked`
    /// counts both kinds.
    pub fn panic_count(&self) -> usize {
        self.shared.panic_handler.panic_count()
    }
}

fn stop_and_join<P>(shared: &Shared<P>, handles: Vec<WorkerHandle>) {
    shared.state.lock().stopping = true;
    shared.available.notify_all();
    join_workers(handles);
}

fn join_workers(handles: impl IntoIterator<Item = WorkerHandle>) {
    for handle in handles {
        if handle.thread.join().is_err() {
            error!(worker = handle.id, "worker thread panicked");
        }
    }
}

impl<P> Default for ThreadPool<P>
where
    P: Ord + Default + Send + 'static,
{
    /// Same as [`with_default_threads`](Self::with_default_threads).
    ///
    /// # Panics
    ///
    /// Panics if the worker threads cannot be spawned.
    fn default() -> Self {
        Self::with_default_threads().expect("failed to start thread pool workers")
    }
}

impl<P> Drop for ThreadPool<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<P> fmt::Debug for ThreadPool<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads)
            .field("queued", &self.queued())
            .field("stopping", &self.shared.state.lock().stopping)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::PanicStrategy;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    fn pool(n: usize) -> ThreadPool {
        ThreadPool::new(n).unwrap()
    }

    #[test]
    fn test_zero_threads_fails() {
        assert!(matches!(ThreadPool::<i32>::new(0), Err(Error::Config(_))));
    }

    #[test]
    fn test_num_threads() {
        assert_eq!(pool(3).num_threads(), 3);
        let default_pool: ThreadPool = ThreadPool::with_default_threads().unwrap();
        assert!(default_pool.num_threads() >= 1);
    }

    #[test]
    fn test_worker_thread_names() {
        let config = Config::builder()
            .num_threads(1)
            .thread_name_prefix("named")
            .build()
            .unwrap();
        let pool: ThreadPool = ThreadPool::with_config(&config).unwrap();

        let name = pool
            .submit(|| thread::current().name().map(str::to_owned))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name.as_deref(), Some("named-0"));
    }

    #[test]
    fn test_execute_fire_and_forget() {
        let pool = pool(1);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let counter = counter.clone();
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        // lower priority, so on a single worker it runs after all of the above
        let seen = {
            let counter = counter.clone();
            pool.submit_with_priority(-1, move || counter.load(Ordering::SeqCst))
                .unwrap()
        };
        assert_eq!(seen.join().unwrap(), 10);
    }

    #[test]
    fn test_panicking_execute_keeps_worker_alive() {
        let config = Config::builder()
            .num_threads(1)
            .panic_strategy(PanicStrategy::Isolate)
            .build()
            .unwrap();
        let pool: ThreadPool = ThreadPool::with_config(&config).unwrap();

        pool.execute(|| panic!("unobserved")).unwrap();
        let after = pool.submit(|| "still running").unwrap();

        assert_eq!(after.join().unwrap(), "still running");
        assert_eq!(pool.panic_count(), 1);

        // reported through the handle, not the panic handler
        let observed = pool.submit(|| -> i32 { panic!("observed") }).unwrap();
        assert!(observed.join().is_err());
        assert_eq!(pool.panic_count(), 1);
    }

    #[test]
    fn test_submit_after_shutdown_rejected() {
        let pool = pool(2);
        pool.shutdown();

        assert!(pool.is_shut_down());
        assert!(matches!(pool.submit(|| 1), Err(Error::ShutDown)));
        assert!(matches!(pool.execute(|| {}), Err(Error::ShutDown)));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let pool = pool(4);
        pool.shutdown();
        pool.shutdown();
        drop(pool);
    }

    #[test]
    fn test_queued_tasks_abandoned_on_shutdown() {
        let pool = pool(1);
        let started = Arc::new(Barrier::new(2));

        let running = {
            let started = started.clone();
            pool.submit(move || {
                started.wait();
                thread::sleep(Duration::from_millis(50));
                "finished"
            })
            .unwrap()
        };
        started.wait();

        let queued = pool.submit(|| "never").unwrap();
        pool.shutdown();

        assert_eq!(running.join().unwrap(), "finished");
        assert!(matches!(queued.join(), Err(Error::Abandoned)));
    }

    #[test]
    fn test_shutdown_from_worker() {
        let pool = Arc::new(pool(2));

        let inner = pool.clone();
        let handle = pool.submit(move || inner.shutdown()).unwrap();

        handle.join().unwrap();
        assert!(pool.is_shut_down());

        // the worker could not join itself, so this call joins everyone
        pool.shutdown();
        assert!(pool.workers.lock().is_empty());
    }

    #[test]
    fn test_concurrent_shutdowns_wait_for_workers() {
        let pool = Arc::new(pool(1));
        let started = Arc::new(Barrier::new(2));
        let finished = Arc::new(AtomicBool::new(false));

        {
            let started = started.clone();
            let finished = finished.clone();
            pool.execute(move || {
                started.wait();
                thread::sleep(Duration::from_millis(300));
                finished.store(true, Ordering::SeqCst);
            })
            .unwrap();
        }
        started.wait();

        let first = {
            let pool = pool.clone();
            thread::spawn(move || pool.shutdown())
        };
        thread::sleep(Duration::from_millis(50));

        pool.shutdown();
        assert!(finished.load(Ordering::SeqCst));
        first.join().unwrap();
    }

    #[test]
    fn test_default_pool() {
        let pool = ThreadPool::<i32>::default();
        assert!(pool.num_threads() >= 1);
        assert_eq!(pool.submit(|| 5).unwrap().join().unwrap(), 5);
    }

    #[test]
    fn test_peek_priority() {
        let pool = pool(1);
        assert_eq!(pool.peek_priority(), None);

        let gate = Arc::new(Barrier::new(2));
        let blocker = {
            let gate = gate.clone();
            pool.submit(move || {
                gate.wait();
            })
            .unwrap()
        };
        while pool.queued() != 0 {
            thread::yield_now();
        }

        pool.execute_with_priority(3, || {}).unwrap();
        pool.execute_with_priority(9, || {}).unwrap();
        pool.execute_with_priority(-2, || {}).unwrap();
        assert_eq!(pool.peek_priority(), Some(9));

        gate.wait();
        blocker.join().unwrap();
    }

    #[cfg(feature = "telemetry")]
    #[test]
    fn test_metrics_counts() {
        let pool = pool(2);

        let ok = pool.submit(|| 1).unwrap();
        let bad = pool.submit(|| -> i32 { panic!("counted") }).unwrap();
        ok.join().unwrap();
        assert!(bad.join().is_err());

        pool.shutdown();
        let _ = pool.submit(|| 2);

        let snapshot = pool.metrics();
        assert_eq!(snapshot.tasks_submitted, 2);
        assert_eq!(snapshot.tasks_executed, 2);
        assert_eq!(snapshot.tasks_panicked, 1);
        assert_eq!(snapshot.tasks_rejected, 1);
    }
}
