use crate::runtime::context::{CURRENT_WORKER_ID, enter_context};
use crate::runtime::handle::Handle;
use crate::runtime::schedule::Schedule;
use crate::runtime::task::Runnable;

use std::sync::Arc;
use std::sync::atomic::Ordering;

/// One thread of the work-stealing pool.
///
/// Work is looked up in this order: own queue, injector, peers. A worker
/// that finds nothing parks on the injector.
pub(crate) struct Worker {
    id: usize,
    handle: Handle,
}

impl Worker {
    pub(crate) fn new(id: usize, handle: Handle) -> Self {
        Self { id, handle }
    }

    /// Thread body. The runtime context stays installed until the worker
    /// observes shutdown.
    pub(crate) fn run(&self) {
        CURRENT_WORKER_ID.with(|id| *id.borrow_mut() = Some(self.id));

        let span = tracing::debug_span!("worker", id = self.id);
        let _entered = span.enter();
        tracing::trace!("started");

        let executor: Arc<dyn Schedule> = Arc::new(self.handle.clone());
        let executed = enter_context(Some(self.handle.clone()), executor, || self.drive());

        tracing::trace!(executed, "stopped");
    }

    fn drive(&self) -> u64 {
        let shared = &self.handle.shared;
        let mut executed = 0;

        while !shared.shutdown.load(Ordering::Acquire) {
            match self.next_runnable() {
                Some(runnable) => {
                    runnable.run();
                    executed += 1;
                }
                None => shared.injector.park(),
            }
        }

        executed
    }

    fn next_runnable(&self) -> Option<Arc<dyn Runnable>> {
        let shared = &self.handle.shared;

        shared.locals[self.id]
            .pop()
            .or_else(|| shared.injector.steal())
            .or_else(|| self.steal_from_peers())
    }

    /// Visits the other workers once, starting with the next id.
    fn steal_from_peers(&self) -> Option<Arc<dyn Runnable>> {
        let locals = &self.handle.shared.locals;

        (1..locals.len())
            .map(|offset| (self.id + offset) % locals.len())
            .find_map(|victim| locals[victim].steal())
    }
}
