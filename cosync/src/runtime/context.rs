use crate::runtime::handle::Handle;
use crate::runtime::schedule::Schedule;

use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    /// Handle of the runtime whose worker is running on this thread.
    ///
    /// This is set when entering the runtime context and allows
    /// runtime components (spawning, timers) to find their runtime
    /// without explicit parameter passing.
    pub(crate) static CURRENT_HANDLE: RefCell<Option<Handle>> =
        const { RefCell::new(None) };

    /// Thread-local identifier of the current worker thread.
    pub(crate) static CURRENT_WORKER_ID: RefCell<Option<usize>> =
        const { RefCell::new(None) };

    /// Executor that wake-ups default to when none is given explicitly.
    ///
    /// Set by runtime workers and by [`LocalExecutor::block_on`].
    ///
    /// [`LocalExecutor::block_on`]: crate::runtime::LocalExecutor::block_on
    pub(crate) static CURRENT_EXECUTOR: RefCell<Option<Arc<dyn Schedule>>> =
        const { RefCell::new(None) };
}

/// Enters a runtime execution context for the current thread.
///
/// This function temporarily installs thread-local runtime state
/// (runtime handle and default executor) for the duration of the
/// closure `f`. After the closure completes, the previous context is
/// restored.
///
/// # Arguments
///
/// * `handle` - Handle to the runtime, if the caller is a runtime worker.
/// * `executor` - Default executor for wake-ups.
/// * `f` - Closure executed inside the runtime context.
pub(crate) fn enter_context<R>(
    handle: Option<Handle>,
    executor: Arc<dyn Schedule>,
    f: impl FnOnce() -> R,
) -> R {
    CURRENT_HANDLE.with(|h| {
        CURRENT_EXECUTOR.with(|e| {
            let prev_h = h.replace(handle);
            let prev_e = e.replace(Some(executor));

            let out = f();

            e.replace(prev_e);
            h.replace(prev_h);

            out
        })
    })
}

/// Returns the executor the current thread is running on, if any.
///
/// Inside a [`Runtime`](crate::runtime::Runtime) worker this is the
/// runtime's [`Handle`]; inside
/// [`LocalExecutor::block_on`](crate::runtime::LocalExecutor::block_on) it
/// is the local executor.
pub fn current_executor() -> Option<Arc<dyn Schedule>> {
    CURRENT_EXECUTOR.with(|cell| cell.borrow().clone())
}
