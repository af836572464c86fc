//! Asynchronous task primitives.
//!
//! This module defines the abstractions used by the runtime to
//! represent, schedule, and execute units of work.
//!
//! It includes:
//! - task lifecycle states,
//! - custom waker integration,
//! - join handles for awaiting task completion,
//! - posted jobs, the closures handed to [`Schedule::post`].
//!
//! Most users will interact with this module through [`spawn`] and
//! [`JoinHandle`], while the lower-level components are used internally
//! by the executor.
//!
//! [`Schedule::post`]: crate::runtime::Schedule::post

pub(crate) mod handle;
pub(crate) mod job;
pub(crate) mod waker;

mod core;

pub(crate) use self::core::{Runnable, Task};
pub(crate) use job::JobTask;

pub use self::core::spawn;
pub use handle::JoinHandle;
