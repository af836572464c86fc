//! Run queues of the multi-threaded runtime.
//!
//! - [`injector`]: the global queue. Spawns from outside a worker, woken
//!   tasks and every posted wake-up land here. It is a
//!   [`LockFreeQueue`](crate::queue::LockFreeQueue), so pushing never
//!   blocks the releasing side of a lock.
//! - [`queue`]: one queue per worker for tasks spawned on that worker.
//!   Idle peers steal from its front.

pub(crate) mod injector;
pub(crate) mod queue;
