//! Ordering of queued work.
//!
//! The pool keeps a single priority queue guarded by its mutex; workers
//! always take the most urgent item, with submission order breaking ties.

pub mod priority;

pub(crate) use priority::PriorityQueue;
