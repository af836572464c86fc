use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::task::Waker;
use std::time::Instant;

/// A unit of work posted onto an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The capability of receiving work, implemented by every executor.
///
/// The synchronization primitives only depend on this trait, so they work
/// with the multi-threaded [`Runtime`](crate::runtime::Runtime), the
/// single-threaded [`LocalExecutor`](crate::runtime::LocalExecutor), or any
/// custom loop such as a test harness.
///
/// # Contract
///
/// - [`post`](Self::post) never runs the job on the caller's stack.
/// - [`dispatch`](Self::dispatch) may run the job inline when the caller is
///   already running on this executor.
/// - [`set_timer`](Self::set_timer) wakes `waker` once `deadline` has
///   passed, unless `cancelled` is set by then.
pub trait Schedule: Send + Sync {
    /// Queues `job` for later execution on this executor.
    fn post(&self, job: Job);

    /// Runs `job` inline if possible, otherwise posts it.
    ///
    /// The default implementation always posts.
    fn dispatch(&self, job: Job) {
        self.post(job);
    }

    /// Arms a one-shot timer.
    fn set_timer(&self, deadline: Instant, waker: Waker, cancelled: Arc<AtomicBool>);
}

impl<S: Schedule + ?Sized> Schedule for Arc<S> {
    fn post(&self, job: Job) {
        (**self).post(job);
    }

    fn dispatch(&self, job: Job) {
        (**self).dispatch(job);
    }

    fn set_timer(&self, deadline: Instant, waker: Waker, cancelled: Arc<AtomicBool>) {
        (**self).set_timer(deadline, waker, cancelled);
    }
}
