use crate::queue::LockFreeQueue;
use crate::reactor::timer::{TimerEntry, TimerQueue};
use crate::runtime::context::enter_context;
use crate::runtime::schedule::{Job, Schedule};

use parking_lot::{Condvar, Mutex};

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::task::{Context, Poll, Wake, Waker};
use std::time::Instant;

/// Wake-up signal of the thread driving a [`LocalExecutor`].
#[derive(Default)]
struct Notify {
    pending: Mutex<bool>,
    condvar: Condvar,
}

impl Notify {
    fn notify(&self) {
        *self.pending.lock() = true;
        self.condvar.notify_one();
    }

    /// Blocks until notified or until `deadline`, whichever comes first.
    fn wait(&self, deadline: Option<Instant>) {
        let mut pending = self.pending.lock();

        if !*pending {
            match deadline {
                Some(deadline) => {
                    let _ = self.condvar.wait_until(&mut pending, deadline);
                }
                None => self.condvar.wait(&mut pending),
            }
        }

        *pending = false;
    }
}

impl Wake for Notify {
    fn wake(self: Arc<Self>) {
        self.notify();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.notify();
    }
}

/// A single-threaded event loop.
///
/// Jobs may be posted from any thread; they run on whichever thread calls
/// [`run_until_idle`](Self::run_until_idle), [`run_until`](Self::run_until)
/// or [`block_on`](Self::block_on). Timers are kept in the loop itself, so
/// timed acquisitions work without a [`Runtime`](crate::runtime::Runtime).
///
/// # Examples
///
/// ```rust
/// use cosync::runtime::LocalExecutor;
/// use cosync::sync::CoMutex;
///
/// let executor = LocalExecutor::new();
/// let mutex = CoMutex::new();
///
/// executor.block_on(async {
///     mutex.lock().await;
///     assert!(mutex.is_locked());
///     mutex.unlock().unwrap();
/// });
/// ```
pub struct LocalExecutor {
    jobs: LockFreeQueue<Job>,
    timers: Mutex<TimerQueue>,
    notify: Arc<Notify>,
}

impl LocalExecutor {
    /// Creates an executor with no pending work.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            jobs: LockFreeQueue::new(),
            timers: Mutex::new(TimerQueue::new()),
            notify: Arc::new(Notify::default()),
        })
    }

    /// Runs posted jobs and expired timers until none is left.
    ///
    /// Timers that are not yet due are left pending. Returns the number of
    /// jobs executed.
    pub fn run_until_idle(self: &Arc<Self>) -> usize {
        let executor: Arc<dyn Schedule> = self.clone();
        enter_context(None, executor, || self.drain())
    }

    /// Runs the loop, sleeping between timers, until `deadline` is reached.
    ///
    /// Returns the number of jobs executed.
    pub fn run_until(self: &Arc<Self>, deadline: Instant) -> usize {
        let mut executed = 0;

        loop {
            executed += self.run_until_idle();

            if Instant::now() >= deadline {
                return executed;
            }

            let wake_at = self
                .timers
                .lock()
                .next_deadline()
                .map_or(deadline, |t| t.min(deadline));

            self.notify.wait(Some(wake_at));
        }
    }

    /// Drives `future` to completion on the calling thread.
    ///
    /// Posted jobs and timers are processed between polls. While the
    /// future runs, this executor is the default executor for wake-ups.
    pub fn block_on<F: Future>(self: &Arc<Self>, future: F) -> F::Output {
        let mut future = pin!(future);
        let waker = Waker::from(self.notify.clone());
        let mut cx = Context::from_waker(&waker);
        let executor: Arc<dyn Schedule> = self.clone();

        loop {
            let (poll, executed) = enter_context(None, executor.clone(), || {
                let poll = future.as_mut().poll(&mut cx);
                (poll, self.drain())
            });

            if let Poll::Ready(output) = poll {
                return output;
            }

            // A job may have completed what the future is waiting for.
            if executed > 0 || !self.jobs.is_empty() {
                continue;
            }

            let next_timer = self.timers.lock().next_deadline();
            self.notify.wait(next_timer);
        }
    }

    /// Runs every ready job and fires every expired timer.
    fn drain(&self) -> usize {
        let mut executed = 0;

        loop {
            let fired = self.timers.lock().expire(Instant::now());
            for waker in fired {
                waker.wake();
            }

            let Some(job) = self.jobs.dequeue() else {
                return executed;
            };

            job();
            executed += 1;
        }
    }
}

impl Schedule for LocalExecutor {
    fn post(&self, job: Job) {
        self.jobs.enqueue(job);
        self.notify.notify();
    }

    fn set_timer(&self, deadline: Instant, waker: Waker, cancelled: Arc<AtomicBool>) {
        self.timers.lock().push(TimerEntry {
            deadline,
            waker,
            cancelled,
        });
        self.notify.notify();
    }
}
