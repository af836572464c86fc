use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::task::Waker;
use std::time::Instant;

/// A request sent to the reactor thread.
pub(crate) enum Command {
    /// Wake `waker` at `deadline` unless `cancelled` is set by then.
    SetTimer {
        deadline: Instant,
        waker: Waker,
        cancelled: Arc<AtomicBool>,
    },

    /// Stop the reactor loop.
    Shutdown,
}
