//! Error types for the synchronization primitives.
//!
//! Only usage-contract violations are errors. An acquisition that times out
//! is an expected outcome and is reported as `false` by the timed
//! operations, never through [`SyncError`].

/// Errors reported by [`CoMutex`](crate::sync::CoMutex) and
/// [`CoSemaphore`](crate::sync::CoSemaphore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The mutex was destroyed while still held.
    #[error("mutex destroyed while locked")]
    DroppedWhileLocked,

    /// The semaphore was destroyed while tasks were still waiting on it.
    #[error("semaphore destroyed with {0} pending waiter(s)")]
    DroppedWithWaiters(usize),

    /// `unlock` was called on a mutex that is not locked.
    #[error("unlock called on a mutex that is not locked")]
    NotLocked,

    /// Returning permits would push the count above the semaphore maximum.
    #[error("permit count would exceed the maximum of {max}")]
    PermitOverflow {
        /// The compile-time maximum of the semaphore.
        max: usize,
    },
}

/// Result alias used throughout the synchronization API.
pub type Result<T> = std::result::Result<T, SyncError>;
