use crate::error::{Result, SyncError};
use crate::queue::LockFreeQueue;
use crate::runtime::Schedule;
use crate::sync::waiter::{self, Permits, Wait};
use crate::sync::wake_up::WakeUp;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering, fence};
use std::task::{Context, Poll};
use std::thread;
use std::time::{Duration, Instant};

/// An asynchronous mutual-exclusion lock without associated data.
///
/// A task that cannot take the lock is suspended instead of blocking its
/// worker thread. On [`unlock`](Self::unlock), ownership is handed straight
/// to the oldest waiter that is still interested, so the mutex is never
/// observably free between two owners.
///
/// The lock is not tied to a guard: whoever acquired it calls `unlock`.
/// [`CoUniqueLock`](super::CoUniqueLock) and [`Mutex`](super::Mutex) add
/// scope-bound release on top.
///
/// # Panics
///
/// Dropping a `CoMutex` that is still locked is a usage error and panics.
/// Use [`close`](Self::close) to get the error instead.
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
///     assert!(!mutex.try_lock());
///     mutex.unlock().unwrap();
/// });
///
/// assert!(!mutex.is_locked());
/// ```
pub struct CoMutex {
    locked: AtomicBool,
    waiters: LockFreeQueue<Arc<WakeUp>>,
}

impl CoMutex {
    /// Creates an unlocked mutex.
    pub fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            waiters: LockFreeQueue::new(),
        }
    }

    /// Takes the lock if it is free, without suspending.
    ///
    /// This does not look at the wait queue, so it may take the lock ahead
    /// of queued waiters.
    pub fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Returns a future that resolves once the lock is held.
    ///
    /// When the lock is contended, the wake-up is posted onto the executor
    /// the awaiting task runs on.
    ///
    /// # Panics
    ///
    /// The future panics if it has to suspend outside of an executor.
    pub fn lock(&self) -> Lock<'_> {
        Lock {
            wait: Wait::new(self, None, None),
        }
    }

    /// Like [`lock`](Self::lock), posting the wake-up onto `executor`.
    pub fn lock_on(&self, executor: Arc<dyn Schedule>) -> Lock<'_> {
        Lock {
            wait: Wait::new(self, Some(executor), None),
        }
    }

    /// Acquires the lock and then runs `handler(true)` on `executor`.
    ///
    /// The handler is posted even if the lock is free right away; it never
    /// runs on the caller's stack.
    pub fn async_lock<F>(&self, executor: Arc<dyn Schedule>, handler: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        waiter::acquire_with(self, executor, None, handler);
    }

    /// Callback form of [`try_lock_for`](Self::try_lock_for).
    ///
    /// `handler` receives `true` if the lock was acquired and `false` if
    /// `timeout` elapsed first.
    pub fn async_lock_for<F>(&self, executor: Arc<dyn Schedule>, timeout: Duration, handler: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        waiter::acquire_with(self, executor, Some(Instant::now() + timeout), handler);
    }

    /// Tries to acquire the lock within `timeout`.
    ///
    /// Resolves to `true` if the lock is now held by the caller and to
    /// `false` if the timeout elapsed first. Exactly one of the two
    /// happens.
    ///
    /// A timed-out attempt leaves its inert token in the wait queue until
    /// the next [`unlock`](Self::unlock) sweeps it out. Retrying in a loop
    /// while one holder keeps the lock therefore grows the queue by one
    /// small allocation per attempt.
    pub fn try_lock_for(&self, timeout: Duration) -> TimedLock<'_> {
        self.try_lock_until(Instant::now() + timeout)
    }

    /// Tries to acquire the lock before `deadline`.
    pub fn try_lock_until(&self, deadline: Instant) -> TimedLock<'_> {
        TimedLock {
            wait: Wait::new(self, None, Some(deadline)),
        }
    }

    /// Releases the lock.
    ///
    /// If a task is waiting, ownership passes to it directly. Otherwise
    /// the mutex becomes free.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotLocked`] if the mutex is not locked.
    pub fn unlock(&self) -> Result<()> {
        if !self.locked.load(Ordering::Acquire) {
            return Err(SyncError::NotLocked);
        }

        self.release();
        Ok(())
    }

    /// Returns `true` if the mutex is currently held.
    ///
    /// The answer may be stale by the time the caller looks at it.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Destroys the mutex, reporting whether it was still locked.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DroppedWhileLocked`] if the mutex is held.
    pub fn close(self) -> Result<()> {
        let locked = self.locked.swap(false, Ordering::AcqRel);
        waiter::drain_live(&self.waiters);

        if locked {
            Err(SyncError::DroppedWhileLocked)
        } else {
            Ok(())
        }
    }

    /// Gives up ownership held by the caller.
    fn release(&self) {
        loop {
            if waiter::hand_off(&self.waiters) {
                return;
            }

            self.locked.store(false, Ordering::Release);
            fence(Ordering::SeqCst);

            // A waiter queued after the hand-off attempt may have failed
            // its retry before the store above. Take the lock back for it.
            if self.waiters.is_empty() || !self.try_lock() {
                return;
            }
        }
    }
}

impl Permits for CoMutex {
    fn try_take(&self) -> bool {
        self.try_lock()
    }

    fn give_back(&self) {
        self.release();
    }

    fn waiters(&self) -> &LockFreeQueue<Arc<WakeUp>> {
        &self.waiters
    }
}

impl Default for CoMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CoMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoMutex")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

impl Drop for CoMutex {
    fn drop(&mut self) {
        if self.locked.load(Ordering::Acquire) && !thread::panicking() {
            tracing::error!("CoMutex dropped while locked");
            panic!("{}", SyncError::DroppedWhileLocked);
        }
    }
}

/// Future returned by [`CoMutex::lock`].
///
/// Dropping it before completion gives up the place in the queue. If the
/// lock had already been handed to it, the lock is released again.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Lock<'a> {
    wait: Wait<'a, CoMutex>,
}

impl Future for Lock<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.wait).poll(cx).map(|_| ())
    }
}

/// Future returned by [`CoMutex::try_lock_for`] and
/// [`CoMutex::try_lock_until`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct TimedLock<'a> {
    wait: Wait<'a, CoMutex>,
}

impl Future for TimedLock<'_> {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        Pin::new(&mut self.wait).poll(cx)
    }
}
