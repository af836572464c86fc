use crate::runtime::task::Task;
use crate::runtime::task::core::COMPLETED;

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};

/// Awaits the output of a spawned task.
///
/// Dropping a `JoinHandle` detaches the task: it keeps running and its
/// output is discarded.
pub struct JoinHandle<T> {
    pub(crate) task: Arc<Task<T>>,
}

impl<T> JoinHandle<T> {
    /// Returns `true` once the task has run to completion.
    pub fn is_finished(&self) -> bool {
        self.task.state.load(Ordering::Acquire) == COMPLETED
    }

    fn try_take(&self) -> Option<T> {
        self.is_finished()
            .then(|| self.task.output.lock().take())
            .flatten()
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if polled again after it returned the output.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if self.is_finished() {
            let output = self.try_take().expect("JoinHandle polled after completion");
            return Poll::Ready(output);
        }

        // Register first, then look again, so a completion racing with
        // the registration is not missed.
        self.task.joiners.lock().push(cx.waker().clone());

        match self.try_take() {
            Some(output) => Poll::Ready(output),
            None => Poll::Pending,
        }
    }
}
