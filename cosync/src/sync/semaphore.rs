use crate::error::{Result, SyncError};
use crate::queue::LockFreeQueue;
use crate::runtime::Schedule;
use crate::sync::waiter::{self, Permits, Wait};
use crate::sync::wake_up::WakeUp;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering, fence};
use std::task::{Context, Poll};
use std::thread;
use std::time::{Duration, Instant};

/// A counting semaphore holding at most `MAX` permits.
///
/// Acquirers that find no permit are suspended and queued in arrival order.
/// A released permit goes directly to the oldest live waiter, and only
/// returns to the counter when nobody is waiting.
///
/// `MAX` must be at least 1. [`CoBinarySemaphore`] is the `MAX == 1` case.
///
/// # Examples
///
/// ```rust
/// use cosync::runtime::LocalExecutor;
/// use cosync::sync::CoSemaphore;
///
/// let executor = LocalExecutor::new();
/// let semaphore = CoSemaphore::<2>::new();
///
/// executor.block_on(async {
///     semaphore.acquire().await;
///     semaphore.acquire().await;
///     assert!(!semaphore.try_acquire());
///
///     semaphore.release_n(2).unwrap();
/// });
///
/// assert_eq!(semaphore.count(), 2);
/// ```
pub struct CoSemaphore<const MAX: usize> {
    count: AtomicUsize,
    waiters: LockFreeQueue<Arc<WakeUp>>,
}

/// A semaphore with a single permit.
pub type CoBinarySemaphore = CoSemaphore<1>;

impl<const MAX: usize> CoSemaphore<MAX> {
    /// Creates a semaphore with all `MAX` permits available.
    ///
    /// A semaphore without permits is rejected when the code is built.
    /// The check runs during monomorphization, so `cargo check` alone does
    /// not report it.
    ///
    /// ```compile_fail
    /// use cosync::sync::CoSemaphore;
    ///
    /// let empty = CoSemaphore::<0>::new();
    /// # drop(empty);
    /// ```
    pub fn new() -> Self {
        const { assert!(MAX > 0, "a semaphore needs at least one permit") };

        Self {
            count: AtomicUsize::new(MAX),
            waiters: LockFreeQueue::new(),
        }
    }

    /// Creates a semaphore with `permits` permits available.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PermitOverflow`] if `permits > MAX`.
    pub fn with_permits(permits: usize) -> Result<Self> {
        if permits > MAX {
            return Err(SyncError::PermitOverflow { max: MAX });
        }

        let semaphore = Self::new();
        semaphore.count.store(permits, Ordering::Release);
        Ok(semaphore)
    }

    /// Takes a permit if one is available, without suspending.
    ///
    /// Like [`CoMutex::try_lock`](super::CoMutex::try_lock), this may take a
    /// permit ahead of queued waiters.
    pub fn try_acquire(&self) -> bool {
        self.count
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |count| {
                count.checked_sub(1)
            })
            .is_ok()
    }

    /// Returns a future that resolves once a permit is held.
    ///
    /// # Panics
    ///
    /// The future panics if it has to suspend outside of an executor.
    pub fn acquire(&self) -> Acquire<'_, MAX> {
        Acquire {
            wait: Wait::new(self, None, None),
        }
    }

    /// Like [`acquire`](Self::acquire), posting the wake-up onto `executor`.
    pub fn acquire_on(&self, executor: Arc<dyn Schedule>) -> Acquire<'_, MAX> {
        Acquire {
            wait: Wait::new(self, Some(executor), None),
        }
    }

    /// Acquires a permit and then runs `handler(true)` on `executor`.
    pub fn async_acquire<F>(&self, executor: Arc<dyn Schedule>, handler: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        waiter::acquire_with(self, executor, None, handler);
    }

    /// Callback form of [`try_acquire_for`](Self::try_acquire_for).
    pub fn async_acquire_for<F>(&self, executor: Arc<dyn Schedule>, timeout: Duration, handler: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        waiter::acquire_with(self, executor, Some(Instant::now() + timeout), handler);
    }

    /// Tries to acquire a permit within `timeout`.
    ///
    /// As with [`CoMutex::try_lock_for`](super::CoMutex::try_lock_for), a
    /// timed-out attempt stays queued as an inert token until the next
    /// release sweeps it out.
    pub fn try_acquire_for(&self, timeout: Duration) -> TimedAcquire<'_, MAX> {
        self.try_acquire_until(Instant::now() + timeout)
    }

    /// Tries to acquire a permit before `deadline`.
    pub fn try_acquire_until(&self, deadline: Instant) -> TimedAcquire<'_, MAX> {
        TimedAcquire {
            wait: Wait::new(self, None, Some(deadline)),
        }
    }

    /// Returns one permit.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PermitOverflow`] if nobody is waiting and the
    /// counter is already at `MAX`.
    pub fn release(&self) -> Result<()> {
        self.release_permits(1)
    }

    /// Returns `n` permits at once.
    ///
    /// Up to `n` live waiters are resumed in arrival order; the remaining
    /// permits go back to the counter. Only available when `MAX > 1`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PermitOverflow`] if the permits that were not
    /// handed to a waiter do not fit under `MAX`. The counter is left
    /// untouched in that case.
    ///
    /// # Binary semaphores
    ///
    /// Calling `release_n` on a [`CoBinarySemaphore`] is a build error. The
    /// check runs during monomorphization, so `cargo check` alone does not
    /// report it; `cargo build` and `cargo test` do.
    ///
    /// ```compile_fail
    /// use cosync::sync::CoBinarySemaphore;
    ///
    /// let semaphore = CoBinarySemaphore::new();
    /// let _ = semaphore.release_n(2);
    /// ```
    ///
    /// The same call compiles for larger semaphores:
    ///
    /// ```
    /// use cosync::sync::CoSemaphore;
    ///
    /// let semaphore = CoSemaphore::<2>::with_permits(0).unwrap();
    /// semaphore.release_n(2).unwrap();
    /// assert_eq!(semaphore.count(), 2);
    /// ```
    pub fn release_n(&self, n: usize) -> Result<()> {
        const { assert!(MAX > 1, "release_n requires a semaphore with more than one permit") };

        self.release_permits(n)
    }

    /// Number of permits currently available.
    ///
    /// The value may be stale by the time the caller looks at it.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// The maximum number of permits.
    pub const fn max(&self) -> usize {
        MAX
    }

    /// Destroys the semaphore, reporting tasks that are still waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DroppedWithWaiters`] with the number of live
    /// waiters if there are any. Their tokens are dropped without being
    /// resumed.
    pub fn close(self) -> Result<()> {
        match waiter::drain_live(&self.waiters) {
            0 => Ok(()),
            live => Err(SyncError::DroppedWithWaiters(live)),
        }
    }

    fn release_permits(&self, n: usize) -> Result<()> {
        let mut remaining = n;

        while remaining > 0 && waiter::hand_off(&self.waiters) {
            remaining -= 1;
        }

        if remaining == 0 {
            return Ok(());
        }

        self.add_permits(remaining)?;
        fence(Ordering::SeqCst);

        // Waiters that queued after the hand-off loop may have missed the
        // permits just added.
        while !self.waiters.is_empty() && self.try_acquire() {
            if !waiter::hand_off(&self.waiters) {
                self.count.fetch_add(1, Ordering::Release);
            }
        }

        Ok(())
    }

    /// Adds `n` permits to the counter, or none of them if `MAX` would be
    /// exceeded.
    fn add_permits(&self, n: usize) -> Result<()> {
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |count| {
                count.checked_add(n).filter(|total| *total <= MAX)
            })
            .map(|_| ())
            .map_err(|_| SyncError::PermitOverflow { max: MAX })
    }
}

impl<const MAX: usize> Permits for CoSemaphore<MAX> {
    fn try_take(&self) -> bool {
        self.try_acquire()
    }

    fn give_back(&self) {
        // A permit obtained through this semaphore always fits back.
        if let Err(e) = self.release_permits(1) {
            tracing::error!(error = %e, "returned permit did not fit");
        }
    }

    fn waiters(&self) -> &LockFreeQueue<Arc<WakeUp>> {
        &self.waiters
    }
}

impl<const MAX: usize> Default for CoSemaphore<MAX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MAX: usize> fmt::Debug for CoSemaphore<MAX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoSemaphore")
            .field("count", &self.count())
            .field("max", &MAX)
            .finish_non_exhaustive()
    }
}

impl<const MAX: usize> Drop for CoSemaphore<MAX> {
    fn drop(&mut self) {
        let live = waiter::drain_live(&self.waiters);

        if live > 0 && !thread::panicking() {
            tracing::error!(waiters = live, "CoSemaphore dropped with pending waiters");
            panic!("{}", SyncError::DroppedWithWaiters(live));
        }
    }
}

/// Future returned by [`CoSemaphore::acquire`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Acquire<'a, const MAX: usize> {
    wait: Wait<'a, CoSemaphore<MAX>>,
}

impl<const MAX: usize> Future for Acquire<'_, MAX> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.wait).poll(cx).map(|_| ())
    }
}

/// Future returned by [`CoSemaphore::try_acquire_for`] and
/// [`CoSemaphore::try_acquire_until`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct TimedAcquire<'a, const MAX: usize> {
    wait: Wait<'a, CoSemaphore<MAX>>,
}

impl<const MAX: usize> Future for TimedAcquire<'_, MAX> {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        Pin::new(&mut self.wait).poll(cx)
    }
}
