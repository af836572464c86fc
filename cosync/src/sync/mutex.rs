use crate::sync::CoMutex;
use crate::sync::co_mutex::Lock;

use std::cell::UnsafeCell;
use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::task::{Context, Poll};

/// An asynchronous mutex protecting a value.
///
/// `Mutex<T>` provides mutual exclusion for async tasks. Unlike
/// a standard `std::sync::Mutex`, this mutex does not block threads
/// when waiting; tasks that cannot acquire the lock are suspended
/// and resumed when the lock is handed to them.
///
/// Locking is delegated to a [`CoMutex`], so waiters are served in
/// arrival order.
pub struct Mutex<T: ?Sized> {
    /// Lock state and wait queue.
    raw: CoMutex,

    /// The underlying data protected by the mutex.
    ///
    /// UnsafeCell allows mutable access through shared references,
    /// which is safe because `raw` guarantees mutual exclusion.
    data: UnsafeCell<T>,
}

// Safety: `Mutex<T>` can be sent across threads if `T` is Send.
unsafe impl<T: ?Sized + Send> Send for Mutex<T> {}
// Safety: only the holder of `raw` reaches `data`, so sharing the mutex
// only ever moves access to `T` between threads one at a time.
unsafe impl<T: ?Sized + Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    /// Creates a new unlocked mutex wrapping the given value.
    ///
    /// # Example
    /// ```
    /// use cosync::sync::Mutex;
    ///
    /// let mutex = Mutex::new(42);
    /// assert_eq!(mutex.into_inner(), 42);
    /// ```
    pub fn new(value: T) -> Mutex<T> {
        Self {
            raw: CoMutex::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Consumes the mutex and returns the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Returns a future that will resolve to a guard when the mutex is acquired.
    ///
    /// This does **not block the thread**. Instead, the task is suspended until
    /// the mutex is handed to it.
    ///
    /// # Example
    /// ```rust
    /// use cosync::runtime::LocalExecutor;
    /// use cosync::sync::Mutex;
    ///
    /// let executor = LocalExecutor::new();
    /// let mutex = Mutex::new(0);
    ///
    /// executor.block_on(async {
    ///     *mutex.lock().await += 1;
    /// });
    ///
    /// assert_eq!(mutex.into_inner(), 1);
    /// ```
    pub fn lock(&self) -> LockFuture<'_, T> {
        LockFuture {
            mutex: self,
            lock: self.raw.lock(),
        }
    }

    /// Acquires the mutex if it is free, without suspending.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.raw.try_lock().then(|| MutexGuard { mutex: self })
    }

    /// Returns a mutable reference to the data.
    ///
    /// No locking is needed since the borrow checker guarantees exclusive
    /// access.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Mutex");

        match self.try_lock() {
            Some(guard) => d.field("data", &&*guard),
            None => d.field("data", &format_args!("<locked>")),
        };

        d.finish()
    }
}

/// Future returned by `Mutex::lock`.
///
/// The future resolves to a `MutexGuard` once the lock is acquired.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct LockFuture<'a, T: ?Sized> {
    mutex: &'a Mutex<T>,
    lock: Lock<'a>,
}

impl<'a, T: ?Sized> Future for LockFuture<'a, T> {
    type Output = MutexGuard<'a, T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mutex = self.mutex;

        Pin::new(&mut self.lock)
            .poll(cx)
            .map(|()| MutexGuard { mutex })
    }
}

/// Guard returned by `Mutex::lock`.
///
/// Releases the mutex when dropped.
#[must_use = "the mutex is unlocked as soon as the guard is dropped"]
pub struct MutexGuard<'a, T: ?Sized> {
    mutex: &'a Mutex<T>,
}

// Safety: the guard hands out `&T`, so sharing it requires `T: Sync`.
unsafe impl<T: ?Sized + Sync> Sync for MutexGuard<'_, T> {}

impl<T: ?Sized> Drop for MutexGuard<'_, T> {
    /// Unlocks the mutex, handing it to the next waiting task (if any).
    fn drop(&mut self) {
        if let Err(e) = self.mutex.raw.unlock() {
            tracing::error!(error = %e, "mutex guard dropped on an unlocked mutex");
        }
    }
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    /// Provides immutable access to the protected data.
    fn deref(&self) -> &Self::Target {
        // Safety: the guard exists only while `raw` is held.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    /// Provides mutable access to the protected data.
    fn deref_mut(&mut self) -> &mut Self::Target {
        // Safety: as above, and `&mut self` rules out aliasing guards.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for MutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
