//! Task execution infrastructure.
//!
//! This module provides the worker threads, the result channel handed back
//! to callers, and the [`ThreadPool`] that ties them together.

pub mod handle;
pub mod panic_handler;
pub mod pool;
pub mod task;
pub mod worker;

pub use handle::TaskHandle;
pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
pub use pool::ThreadPool;
pub use task::{Priority, TaskId};

pub(crate) use task::WorkItem;
