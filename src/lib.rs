//! tidepool - a priority-aware worker thread pool
//!
//! A fixed set of OS threads runs submitted closures, always taking the most
//! urgent queued task first. Each submission can hand back a [`TaskHandle`]
//! that blocks, times out, or is `.await`ed for the closure's return value.
//!
//! # Quick Start
//!
//! ```no_run
//! use tidepool::prelude::*;
//!
//! let pool: ThreadPool = ThreadPool::new(4).unwrap();
//!
//! let answer = pool.submit(|| 6 * 7).unwrap();
//! let urgent = pool.submit_with_priority(10, || "first").unwrap();
//!
//! assert_eq!(urgent.join().unwrap(), "first");
//! assert_eq!(answer.join().unwrap(), 42);
//! ```
//!
//! # Ordering
//!
//! Greater priorities run first. Equal priorities run in submission order.
//! Tasks already running are never preempted, and tasks picked up by
//! different workers run concurrently with no ordering between them.
//!
//! # Failures
//!
//! A panicking task does not take its worker down. With a handle, the panic
//! is reported as [`Error::TaskPanicked`]; fire-and-forget work submitted via
//! [`ThreadPool::execute`] is handled by the configured [`PanicStrategy`].
//!
//! # Shutdown
//!
//! Dropping the pool or calling [`ThreadPool::shutdown`] waits for running
//! tasks and discards queued ones; their handles resolve to
//! [`Error::Abandoned`].

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod scheduler;
pub mod telemetry;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use executor::{PanicStrategy, Priority, TaskHandle, ThreadPool};
pub use telemetry::MetricsSnapshot;
