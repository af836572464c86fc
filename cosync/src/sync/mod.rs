//! Coroutine-aware synchronization primitives.
//!
//! The primitives in this module suspend the calling task instead of
//! blocking its thread. Each one is a single atomic word plus a
//! [`LockFreeQueue`](crate::queue::LockFreeQueue) of [`WakeUp`] tokens:
//!
//! - [`CoMutex`]: a lock without associated data, released explicitly.
//! - [`CoUniqueLock`]: a scope-bound guard over a [`CoMutex`].
//! - [`Mutex`]: a mutex protecting a value, with a `Deref` guard.
//! - [`CoSemaphore`]: a counting semaphore bounded by a compile-time
//!   maximum, and its single-permit form [`CoBinarySemaphore`].
//!
//! ## Design notes
//!
//! - The fast path is a single atomic operation and never touches the
//!   queue. `try_lock` and `try_acquire` may therefore overtake waiters.
//! - A suspended acquirer is resumed by posting its continuation onto the
//!   executor it was waiting on, never by running it on the releasing
//!   task's stack.
//! - Release hands the resource straight to the oldest live waiter.
//!   Tokens whose timeout already fired are skipped.
//! - Every primitive works with any [`Schedule`](crate::runtime::Schedule)
//!   implementation.

mod co_mutex;
mod mutex;
mod semaphore;
mod unique_lock;
mod waiter;

pub mod wake_up;

pub use co_mutex::{CoMutex, Lock, TimedLock};
pub use mutex::{LockFuture, Mutex, MutexGuard};
pub use semaphore::{Acquire, CoBinarySemaphore, CoSemaphore, TimedAcquire};
pub use unique_lock::CoUniqueLock;
pub use wake_up::WakeUp;
