use crate::runtime::task::Task;

use std::sync::Arc;
use std::task::{Wake, Waker};

/// Waking a task reschedules it on its runtime.
///
/// Wakers are reference-counted handles to the task itself, so a waker
/// outliving the runtime keeps the task allocation alive but never runs it.
impl<T: Send + 'static> Wake for Task<T> {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.clone().schedule();
    }
}

/// Creates a [`Waker`] associated with a runtime task.
///
/// The returned waker will reschedule the task when woken.
pub(crate) fn make_waker<T: Send + 'static>(task: Arc<Task<T>>) -> Waker {
    Waker::from(task)
}
