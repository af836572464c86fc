use crate::runtime::handle::Handle;
use crate::runtime::task::JoinHandle;
use crate::runtime::task::waker::make_waker;
use crate::runtime::work_stealing::injector::Injector;

use parking_lot::Mutex;

use std::cell::UnsafeCell;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, Waker};

/// Not queued. The next wake-up queues it.
const IDLE: usize = 0;
/// Sitting in a run queue.
const QUEUED: usize = 1;
/// Being polled by exactly one worker.
const RUNNING: usize = 2;
/// Woken while being polled; requeued once the poll returns.
const NOTIFIED: usize = 3;
/// Terminal. The output is stored in `Task::output`.
pub(crate) const COMPLETED: usize = 4;

/// Anything a worker can pull out of a run queue and execute.
pub(crate) trait Runnable: Send + Sync {
    fn run(self: Arc<Self>);
}

type BoxedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A spawned future together with its scheduling state and its output.
pub(crate) struct Task<T> {
    /// Polled only by the worker that moved `state` to `RUNNING`.
    future: UnsafeCell<BoxedFuture<T>>,

    pub(crate) output: Mutex<Option<T>>,

    pub(crate) state: AtomicUsize,

    /// Where the task goes back when it is woken.
    injector: Arc<Injector>,

    /// Join handles waiting for the output.
    pub(crate) joiners: Mutex<Vec<Waker>>,
}

// Safety: the `UnsafeCell` is only reached from `poll_future`, which runs
// while this task is RUNNING, and only one worker can win that transition.
unsafe impl<T: Send> Send for Task<T> {}
unsafe impl<T: Send> Sync for Task<T> {}

impl<T: Send + 'static> Task<T> {
    /// Wraps `future`. The task starts out `QUEUED` because the caller is
    /// about to push it.
    pub(crate) fn new<F>(future: F, injector: Arc<Injector>) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            future: UnsafeCell::new(Box::pin(future)),
            output: Mutex::new(None),
            state: AtomicUsize::new(QUEUED),
            injector,
            joiners: Mutex::new(Vec::new()),
        }
    }

    fn transition(&self, from: usize, to: usize) -> bool {
        self.state
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn requeue(self: &Arc<Self>) {
        self.injector.push(self.clone());
    }

    /// Polls the future once, if this worker wins the right to.
    pub(crate) fn run(self: Arc<Self>) {
        let claimed = match self.state.load(Ordering::Acquire) {
            from @ (QUEUED | NOTIFIED) => self.transition(from, RUNNING),
            _ => false,
        };

        if !claimed {
            return;
        }

        match self.poll_future() {
            Poll::Ready(value) => self.complete(value),
            // A wake-up during the poll left NOTIFIED behind.
            Poll::Pending if !self.transition(RUNNING, IDLE) => {
                self.state.store(QUEUED, Ordering::Release);
                self.requeue();
            }
            Poll::Pending => {}
        }
    }

    fn poll_future(self: &Arc<Self>) -> Poll<T> {
        let waker = make_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        // Safety: the caller holds the RUNNING state.
        let future = unsafe { &mut *self.future.get() };
        future.as_mut().poll(&mut cx)
    }

    fn complete(&self, value: T) {
        *self.output.lock() = Some(value);
        self.state.store(COMPLETED, Ordering::Release);

        for joiner in mem::take(&mut *self.joiners.lock()) {
            joiner.wake();
        }
    }

    /// Called by the task's waker.
    ///
    /// An idle task is queued again; a running one is marked so the
    /// worker requeues it after the current poll. Queued and completed
    /// tasks ignore the wake-up.
    pub(crate) fn schedule(self: Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE if self.transition(IDLE, QUEUED) => {
                    self.requeue();
                    return;
                }
                RUNNING if self.transition(RUNNING, NOTIFIED) => return,
                IDLE | RUNNING => continue,
                _ => return,
            }
        }
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn run(self: Arc<Self>) {
        Task::run(self)
    }
}

/// Spawns a future onto the runtime the caller is running on.
///
/// From a worker thread the task lands on that worker's local queue.
///
/// # Panics
///
/// Panics when called outside of a runtime.
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    Handle::current().spawn(future)
}
