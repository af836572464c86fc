//! Time utilities.
//!
//! This module provides timer futures that integrate with the current
//! executor's timers:
//! - [`sleep`] and [`sleep_until`] for suspending a task,
//! - [`Sleep`], the future they return.

mod sleep;

#[doc(inline)]
pub use sleep::{Sleep, sleep, sleep_until};
