use crate::runtime::task::Runnable;

use parking_lot::Mutex;

use std::collections::VecDeque;
use std::sync::Arc;

/// Run queue owned by one worker.
///
/// Only the owning worker pushes, so the queue never needs to wake anyone.
/// The owner pops the newest task (its data is most likely still in cache);
/// peers steal the oldest one.
pub(crate) struct LocalQueue {
    tasks: Mutex<VecDeque<Arc<dyn Runnable>>>,
}

impl LocalQueue {
    pub(crate) fn new() -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, task: Arc<dyn Runnable>) {
        self.tasks.lock().push_back(task);
    }

    /// Takes the most recently pushed task.
    pub(crate) fn pop(&self) -> Option<Arc<dyn Runnable>> {
        self.tasks.lock().pop_back()
    }

    /// Takes the oldest task, on behalf of another worker.
    pub(crate) fn steal(&self) -> Option<Arc<dyn Runnable>> {
        self.tasks.lock().pop_front()
    }
}
