use crate::queue::LockFreeQueue;
use crate::runtime::task::Runnable;

use parking_lot::{Condvar, Mutex};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Longest nap of an idle worker. Work pushed onto a peer's local queue
/// does not wake anyone, so sleepers must come back and look.
const PARK_TIMEOUT: Duration = Duration::from_millis(10);

/// The runtime's shared run queue.
///
/// Spawns from outside the pool, woken tasks and posted jobs all arrive
/// here. Pushing is lock-free; the mutex only guards the sleeper count.
pub(crate) struct Injector {
    runnables: LockFreeQueue<Arc<dyn Runnable>>,
    sleepers: Mutex<usize>,
    wakeup: Condvar,
    closed: AtomicBool,
}

impl Injector {
    pub(crate) fn new() -> Self {
        Self {
            runnables: LockFreeQueue::new(),
            sleepers: Mutex::new(0),
            wakeup: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn push(&self, runnable: Arc<dyn Runnable>) {
        self.runnables.enqueue(runnable);

        // The lock orders this check after the emptiness check of a
        // worker that is about to sleep.
        if *self.sleepers.lock() > 0 {
            self.wakeup.notify_one();
        }
    }

    /// Takes the oldest runnable.
    pub(crate) fn steal(&self) -> Option<Arc<dyn Runnable>> {
        self.runnables.dequeue()
    }

    /// Sleeps until a push, shutdown, or `PARK_TIMEOUT`.
    pub(crate) fn park(&self) {
        let mut sleepers = self.sleepers.lock();

        if self.closed.load(Ordering::Acquire) || !self.runnables.is_empty() {
            return;
        }

        *sleepers += 1;
        let _ = self.wakeup.wait_for(&mut sleepers, PARK_TIMEOUT);
        *sleepers -= 1;
    }

    pub(crate) fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);

        let _sleepers = self.sleepers.lock();
        self.wakeup.notify_all();
    }
}
