//! Result delivery from a worker back to the submitting caller.
//!
//! A [`Completer`] is moved into the queued closure and written exactly once
//! by the worker that runs it. The caller keeps a [`TaskHandle`], which can
//! block, poll with a timeout, or be `.await`ed. The channel has its own lock
//! and never touches the pool mutex.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::panic_handler::PanicInfo;
use crate::error::{Error, Result};

enum State<R> {
    Pending,
    Value(R),
    Panicked(PanicInfo),
    Abandoned,
    Taken,
}

impl<R> State<R> {
    fn is_pending(&self) -> bool {
        matches!(self, State::Pending)
    }

    fn name(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Value(_) => "value",
            State::Panicked(_) => "panicked",
            State::Abandoned => "abandoned",
            State::Taken => "taken",
        }
    }

    /// Move the outcome out, leaving `Taken` behind a value. `None` while pending.
    fn take(&mut self) -> Option<Result<R>> {
        match self {
            State::Pending => None,
            State::Value(_) => match std::mem::replace(self, State::Taken) {
                State::Value(v) => Some(Ok(v)),
                _ => unreachable!(),
            },
            State::Panicked(info) => Some(Err(Error::TaskPanicked(info.clone()))),
            State::Abandoned => Some(Err(Error::Abandoned)),
            State::Taken => Some(Err(taken())),
        }
    }
}

fn taken() -> Error {
    Error::executor("task result was already taken")
}

struct Inner<R> {
    state: State<R>,
    wakers: Vec<Waker>,
}

struct Slot<R> {
    inner: Mutex<Inner<R>>,
    ready: Condvar,
}

impl<R> Slot<R> {
    fn resolve(&self, state: State<R>) {
        let wakers = {
            let mut inner = self.inner.lock();
            if !inner.state.is_pending() {
                return;
            }
            inner.state = state;
            std::mem::take(&mut inner.wakers)
        };

        self.ready.notify_all();
        for waker in wakers {
            waker.wake();
        }
    }
}

pub(crate) fn channel<R>() -> (Completer<R>, TaskHandle<R>) {
    let slot = Arc::new(Slot {
        inner: Mutex::new(Inner {
            state: State::Pending,
            wakers: Vec::new(),
        }),
        ready: Condvar::new(),
    });

    (
        Completer {
            slot: Some(slot.clone()),
        },
        TaskHandle { slot },
    )
}

/// Producing side of a task's result channel.
///
/// Dropping it without completing resolves the handle to [`Error::Abandoned`].
pub(crate) struct Completer<R> {
    slot: Option<Arc<Slot<R>>>,
}

impl<R> Completer<R> {
    pub fn complete(mut self, outcome: std::result::Result<R, PanicInfo>) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(match outcome {
                Ok(value) => State::Value(value),
                Err(info) => State::Panicked(info),
            });
        }
    }
}

impl<R> Drop for Completer<R> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(State::Abandoned);
        }
    }
}

/// Handle to the eventual result of a submitted task.
///
/// Cloning shares the same result. Once resolved, [`get`](Self::get) can be
/// called any number of times; [`join`](Self::join) moves the value out.
/// A task that panics resolves to [`Error::TaskPanicked`]. A task discarded
/// at pool shutdown before it started resolves to [`Error::Abandoned`].
pub struct TaskHandle<R> {
    slot: Arc<Slot<R>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task has resolved.
    pub fn wait(&self) {
        let mut inner = self.slot.inner.lock();
        while inner.state.is_pending() {
            self.slot.ready.wait(&mut inner);
        }
    }

    /// Block for at most `timeout`. Returns `true` if the task resolved.
    ///
    /// A timeout too large to represent as a deadline waits without limit.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                self.wait();
                return true;
            }
        };
        let mut inner = self.slot.inner.lock();
        while inner.state.is_pending() {
            if self.slot.ready.wait_until(&mut inner, deadline).timed_out() {
                return !inner.state.is_pending();
            }
        }
        true
    }

    pub fn is_finished(&self) -> bool {
        !self.slot.inner.lock().state.is_pending()
    }

    /// Block until resolved and move the result out.
    pub fn join(self) -> Result<R> {
        let mut inner = self.slot.inner.lock();
        loop {
            if let Some(outcome) = inner.state.take() {
                return outcome;
            }
            self.slot.ready.wait(&mut inner);
        }
    }

    /// Like [`join`](Self::join), giving up with [`Error::Timeout`] after `timeout`.
    pub fn join_timeout(self, timeout: Duration) -> Result<R> {
        if !self.wait_timeout(timeout) {
            return Err(Error::Timeout);
        }
        self.join()
    }

    /// Take the result if the task has already resolved.
    pub fn try_join(&self) -> Option<Result<R>> {
        self.slot.inner.lock().state.take()
    }
}

impl<R: Clone> TaskHandle<R> {
    /// Block until resolved and return a copy of the result.
    pub fn get(&self) -> Result<R> {
        let mut inner = self.slot.inner.lock();
        while inner.state.is_pending() {
            self.slot.ready.wait(&mut inner);
        }

        match &inner.state {
            State::Value(v) => Ok(v.clone()),
            State::Panicked(info) => Err(Error::TaskPanicked(info.clone())),
            State::Abandoned => Err(Error::Abandoned),
            State::Taken => Err(taken()),
            State::Pending => unreachable!(),
        }
    }
}

impl<R> Clone for TaskHandle<R> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<R> Future for TaskHandle<R> {
    type Output = Result<R>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.slot.inner.lock();
        if let Some(outcome) = inner.state.take() {
            return Poll::Ready(outcome);
        }

        let waker = cx.waker();
        if !inner.wakers.iter().any(|w| w.will_wake(waker)) {
            inner.wakers.push(waker.clone());
        }
        Poll::Pending
    }
}

impl<R> fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("state", &self.slot.inner.lock().state.name())
            .finish()
    }
}
