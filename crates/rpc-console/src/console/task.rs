//! Background execution handle for the run loop.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Cooperative cancellation flag shared between a task and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Handle to a background thread that polls a [`CancelToken`].
///
/// Dropping the handle requests cancellation but does not join.
#[derive(Debug)]
pub(crate) struct PendingTask<T> {
    cancel: CancelToken,
    handle: Option<thread::JoinHandle<T>>,
}

/// The task's thread panicked instead of returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TaskPanicked;

impl<T: Send + 'static> PendingTask<T> {
    /// Spawns `body` on a named thread, handing it the task's cancel token.
    pub(crate) fn spawn<F>(name: &str, body: F) -> io::Result<Self>
    where
        F: FnOnce(CancelToken) -> T + Send + 'static,
    {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || body(token))?;
        Ok(Self {
            cancel,
            handle: Some(handle),
        })
    }
}

impl<T> PendingTask<T> {
    pub(crate) fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .is_none_or(thread::JoinHandle::is_finished)
    }

    /// Blocks until the thread exits and returns its value.
    pub(crate) fn await_completion(mut self) -> Result<T, TaskPanicked> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| TaskPanicked),
            None => Err(TaskPanicked),
        }
    }
}

impl<T> Drop for PendingTask<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
