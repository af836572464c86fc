use crate::sync::CoMutex;

use std::fmt;

/// Scope-bound ownership of a [`CoMutex`].
///
/// The mutex is unlocked when the guard is dropped, unless ownership was
/// given up early with [`unlock`](Self::unlock) or detached with
/// [`release`](Self::release). The guard can be moved but not cloned.
///
/// # Examples
///
/// ```rust
/// use cosync::runtime::LocalExecutor;
/// use cosync::sync::{CoMutex, CoUniqueLock};
///
/// let executor = LocalExecutor::new();
/// let mutex = CoMutex::new();
///
/// executor.block_on(async {
///     let guard = CoUniqueLock::acquire(&mutex).await;
///     assert!(guard.owns_lock());
/// });
///
/// assert!(!mutex.is_locked());
/// ```
#[must_use = "the mutex is unlocked as soon as the guard is dropped"]
pub struct CoUniqueLock<'a> {
    mutex: &'a CoMutex,
    owns: bool,
}

impl<'a> CoUniqueLock<'a> {
    /// Waits for `mutex` and returns a guard owning it.
    pub async fn acquire(mutex: &'a CoMutex) -> Self {
        mutex.lock().await;

        Self { mutex, owns: true }
    }

    /// Takes `mutex` without waiting, if it is free.
    pub fn try_acquire(mutex: &'a CoMutex) -> Option<Self> {
        mutex.try_lock().then(|| Self { mutex, owns: true })
    }

    /// Wraps a mutex that the caller has already locked.
    ///
    /// The guard takes over the caller's ownership and unlocks on drop.
    pub fn adopt(mutex: &'a CoMutex) -> Self {
        debug_assert!(mutex.is_locked(), "adopting a mutex that is not locked");

        Self { mutex, owns: true }
    }

    /// Returns `true` while this guard is responsible for unlocking.
    pub fn owns_lock(&self) -> bool {
        self.owns
    }

    /// Unlocks the mutex before the guard goes out of scope.
    ///
    /// Has no effect if the guard no longer owns the lock.
    pub fn unlock(&mut self) {
        if std::mem::take(&mut self.owns) {
            self.unlock_owned();
        }
    }

    /// Detaches the guard without unlocking.
    ///
    /// The caller becomes responsible for calling [`CoMutex::unlock`].
    pub fn release(mut self) -> &'a CoMutex {
        self.owns = false;
        self.mutex
    }

    /// The mutex this guard refers to.
    pub fn mutex(&self) -> &'a CoMutex {
        self.mutex
    }

    fn unlock_owned(&self) {
        if let Err(e) = self.mutex.unlock() {
            tracing::error!(error = %e, "guarded mutex was unlocked behind the guard's back");
        }
    }
}

impl fmt::Debug for CoUniqueLock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoUniqueLock")
            .field("owns", &self.owns)
            .finish_non_exhaustive()
    }
}

impl Drop for CoUniqueLock<'_> {
    fn drop(&mut self) {
        if self.owns {
            self.unlock_owned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::LocalExecutor;

    #[test]
    fn test_drop_unlocks() {
        let mutex = CoMutex::new();

        {
            let guard = CoUniqueLock::try_acquire(&mutex).unwrap();
            assert!(guard.owns_lock());
            assert!(mutex.is_locked());
        }

        assert!(!mutex.is_locked());
    }

    #[test]
    fn test_try_acquire_fails_when_held() {
        let mutex = CoMutex::new();
        let _guard = CoUniqueLock::try_acquire(&mutex).unwrap();

        assert!(CoUniqueLock::try_acquire(&mutex).is_none());
    }

    #[test]
    fn test_early_unlock() {
        let mutex = CoMutex::new();
        let mut guard = CoUniqueLock::try_acquire(&mutex).unwrap();

        guard.unlock();
        assert!(!guard.owns_lock());
        assert!(!mutex.is_locked());

        // A second unlock and the drop are both no-ops.
        guard.unlock();
        drop(guard);
        assert!(mutex.try_lock());
        mutex.unlock().unwrap();
    }

    #[test]
    fn test_release_detaches() {
        let mutex = CoMutex::new();
        let guard = CoUniqueLock::try_acquire(&mutex).unwrap();

        let detached = guard.release();
        assert!(detached.is_locked());

        detached.unlock().unwrap();
    }

    #[test]
    fn test_adopt_takes_over_ownership() {
        let mutex = CoMutex::new();
        assert!(mutex.try_lock());

        let guard = CoUniqueLock::adopt(&mutex);
        assert!(std::ptr::eq(guard.mutex(), &mutex));
        drop(guard);

        assert!(!mutex.is_locked());
    }

    #[test]
    fn test_guard_moves_between_scopes() {
        let executor = LocalExecutor::new();
        let mutex = CoMutex::new();

        let guard = executor.block_on(CoUniqueLock::acquire(&mutex));
        let moved = guard;
        assert!(mutex.is_locked());

        drop(moved);
        assert!(!mutex.is_locked());
    }
}
