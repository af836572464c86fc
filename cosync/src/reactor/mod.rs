//! Timer reactor of the multi-threaded runtime.
//!
//! A dedicated thread owns a deadline heap. Any thread registers timers
//! by sending a [`Command`](command::Command); between commands the
//! thread sleeps until the earliest deadline and then wakes the expired
//! wakers. Cancelled timers are discarded silently when they expire.
//!
//! The heap itself, [`TimerQueue`](timer::TimerQueue), is also driven
//! inline by [`LocalExecutor`](crate::runtime::LocalExecutor).

mod core;

pub(crate) mod command;
pub(crate) mod timer;

pub(crate) use self::core::{Reactor, ReactorHandle};
