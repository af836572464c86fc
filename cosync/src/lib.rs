//! # cosync
//!
//! **cosync** provides coroutine-aware synchronization primitives and the
//! lightweight async runtime they run on.
//!
//! A task that cannot take a lock or a permit is suspended instead of
//! blocking its worker thread. When the resource is released, ownership is
//! handed straight to the oldest waiter and its continuation is posted back
//! onto the executor it was waiting on.
//!
//! The crate offers:
//!
//! - A **lock-free MPMC queue** ([`queue::LockFreeQueue`]) with epoch-based
//!   memory reclamation
//! - An **async mutex** ([`sync::CoMutex`]) with hand-off on unlock, timed
//!   acquisition and scope guards ([`sync::CoUniqueLock`], [`sync::Mutex`])
//! - A **bounded counting semaphore** ([`sync::CoSemaphore`])
//! - A **work-stealing runtime** and a **single-threaded executor**, both
//!   implementing the [`runtime::Schedule`] capability
//! - **Timer primitives** ([`time::sleep`])
//! - **Ergonomic macros** like `#[cosync::main]`, `#[cosync::test]` and
//!   `join!`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cosync::sync::CoMutex;
//! use cosync::task;
//! use std::sync::Arc;
//!
//! #[cosync::main]
//! async fn main() {
//!     let mutex = Arc::new(CoMutex::new());
//!
//!     let m = mutex.clone();
//!     let handle = task::spawn(async move {
//!         m.lock().await;
//!         // critical section
//!         m.unlock().unwrap();
//!     });
//!
//!     handle.await;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`queue`]: Lock-free FIFO queue
//! - [`sync`]: Mutexes and semaphores
//! - [`runtime`]: Executors and the runtime builder
//! - [`time`]: Sleep futures
//! - [`error`]: Usage errors of the primitives

mod reactor;

pub mod error;
pub mod queue;
pub mod runtime;
pub mod sync;
pub mod time;

pub use runtime::RuntimeBuilder;
pub use runtime::task;
pub use runtime::yield_now;

pub use cosync_macros::*;
