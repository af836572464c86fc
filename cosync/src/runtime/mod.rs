//! Core runtime components.
//!
//! This module contains the executors the synchronization primitives post
//! their wake-ups onto:
//! - [`Runtime`], a multi-threaded work-stealing runtime with a timer
//!   reactor, built by [`RuntimeBuilder`] and reached through [`Handle`],
//! - [`LocalExecutor`], a single-threaded loop driven by the caller,
//! - [`Schedule`], the capability both of them implement.
//!
//! Most users will interact with [`RuntimeBuilder`], [`spawn`] and the
//! `#[cosync::main]` / `#[cosync::test]` macros rather than with the
//! executors directly.

mod core;
mod executor;
mod work_stealing;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod handle;
pub(crate) mod local;
pub(crate) mod schedule;
pub(crate) mod yield_now;

pub mod task;

pub use self::core::Runtime;
pub use builder::{RuntimeBuilder, WORKER_THREADS_ENV};
pub use context::current_executor;
pub use handle::Handle;
pub use local::LocalExecutor;
pub use schedule::{Job, Schedule};
pub use task::{JoinHandle, spawn};
pub use yield_now::{YieldNow, yield_now};
