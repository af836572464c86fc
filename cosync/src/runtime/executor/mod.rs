//! Worker threads of the multi-threaded runtime.
//!
//! [`core`] starts the workers and the timer reactor and shuts them down
//! again. [`worker`] is the loop each thread runs: local queue first, then
//! the global injector, then its peers, then park.

pub(crate) mod core;
pub(crate) mod worker;
