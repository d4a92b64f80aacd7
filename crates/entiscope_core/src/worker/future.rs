//! Futures returned by the async facade.

use crate::error::{CoreError, CoreResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

enum State<T> {
    Ready(Option<CoreResult<T>>),
    Pending(oneshot::Receiver<CoreResult<T>>),
}

/// Result of an operation scheduled on the worker pool.
///
/// Await it from async code or call [`wait`](Self::wait) from a plain
/// thread. Cancellation is cooperative: [`cancel`](Self::cancel) before the
/// task starts prevents the backend call; after that the task runs to
/// completion.
pub struct OperationFuture<T> {
    state: State<T>,
    cancelled: Arc<AtomicBool>,
}

impl<T> Unpin for OperationFuture<T> {}

impl<T> OperationFuture<T> {
    pub(crate) fn pending(
        receiver: oneshot::Receiver<CoreResult<T>>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            state: State::Pending(receiver),
            cancelled,
        }
    }

    /// Creates a future that is already complete.
    #[must_use]
    pub fn ready(result: CoreResult<T>) -> Self {
        Self {
            state: State::Ready(Some(result)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a future that has already failed.
    #[must_use]
    pub fn failed(error: CoreError) -> Self {
        Self::ready(Err(error))
    }

    /// Requests cancellation. Returns false if it was already requested.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    /// Returns true if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns true if the result is available without waiting.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Blocks the current thread until the operation completes.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime; await the future
    /// there instead.
    pub fn wait(self) -> CoreResult<T> {
        match self.state {
            State::Ready(result) => result.unwrap_or_else(|| Err(polled_after_completion())),
            State::Pending(receiver) => receiver.blocking_recv().unwrap_or_else(|_| Err(lost())),
        }
    }
}

fn lost() -> CoreError {
    CoreError::worker_lost("task ended without a result")
}

fn polled_after_completion() -> CoreError {
    CoreError::invalid_operation("future polled after completion")
}

impl<T> Future for OperationFuture<T> {
    type Output = CoreResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            State::Ready(result) => {
                Poll::Ready(result.take().unwrap_or_else(|| Err(polled_after_completion())))
            }
            State::Pending(receiver) => Pin::new(receiver)
                .poll(cx)
                .map(|received| received.unwrap_or_else(|_| Err(lost()))),
        }
    }
}

impl<T> std::fmt::Debug for OperationFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationFuture")
            .field("ready", &self.is_ready())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
