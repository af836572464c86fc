use crate::reactor::ReactorHandle;
use crate::reactor::command::Command;
use crate::runtime::context::{CURRENT_HANDLE, CURRENT_WORKER_ID};
use crate::runtime::schedule::{Job, Schedule};
use crate::runtime::task::{JobTask, JoinHandle, Runnable, Task};
use crate::runtime::work_stealing::injector::Injector;
use crate::runtime::work_stealing::queue::LocalQueue;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::Waker;
use std::time::Instant;

static NEXT_RUNTIME_ID: AtomicUsize = AtomicUsize::new(0);

/// State shared by every handle and worker of one runtime.
pub(crate) struct Shared {
    /// Distinguishes runtimes living in the same process.
    pub(crate) id: usize,

    /// Global injector queue shared by all workers.
    pub(crate) injector: Arc<Injector>,

    /// One local queue per worker.
    pub(crate) locals: Arc<Vec<Arc<LocalQueue>>>,

    /// Timer reactor of this runtime.
    pub(crate) reactor: ReactorHandle,

    /// Set once the runtime starts shutting down.
    pub(crate) shutdown: AtomicBool,
}

/// A cloneable handle to a running [`Runtime`](crate::runtime::Runtime).
///
/// The handle is the runtime's implementation of [`Schedule`]: it is the
/// executor that wake-ups are posted onto. It can also spawn tasks from
/// any thread.
#[derive(Clone)]
pub struct Handle {
    pub(crate) shared: Arc<Shared>,
}

impl Handle {
    pub(crate) fn new(
        injector: Arc<Injector>,
        locals: Arc<Vec<Arc<LocalQueue>>>,
        reactor: ReactorHandle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed),
                injector,
                locals,
                reactor,
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the handle of the runtime the current thread belongs to.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a runtime worker thread.
    pub fn current() -> Self {
        Self::try_current().expect("must be called within the context of a runtime")
    }

    /// Returns the handle of the runtime the current thread belongs to,
    /// or `None` when called outside of a runtime.
    pub fn try_current() -> Option<Self> {
        CURRENT_HANDLE.with(|cell| cell.borrow().clone())
    }

    /// Spawns a future onto this runtime.
    ///
    /// Tasks spawned after shutdown has begun are never polled.
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let task = Arc::new(Task::new(future, self.shared.injector.clone()));

        if !self.shared.shutdown.load(Ordering::Acquire) {
            self.schedule(task.clone());
        }

        JoinHandle { task }
    }

    /// Returns `true` if both handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Returns `true` if the calling thread is a worker of this runtime.
    fn is_current(&self) -> bool {
        CURRENT_HANDLE.with(|cell| {
            cell.borrow()
                .as_ref()
                .is_some_and(|current| current.shared.id == self.shared.id)
        })
    }

    /// Pushes a runnable onto the local queue of the calling worker, or
    /// onto the global injector when called from any other thread.
    fn schedule(&self, runnable: Arc<dyn Runnable>) {
        let worker = CURRENT_WORKER_ID.with(|id| *id.borrow());

        match worker {
            Some(id) if self.is_current() => self.shared.locals[id].push(runnable),
            _ => self.shared.injector.push(runnable),
        }
    }
}

impl Schedule for Handle {
    /// Posts `job` onto the global injector.
    ///
    /// Posted jobs always go through the injector, never through the
    /// caller's local queue, so a chain of wake-ups is spread across
    /// workers instead of piling up on one.
    fn post(&self, job: Job) {
        self.shared.injector.push(JobTask::new(job));
    }

    /// Runs `job` inline when called from one of this runtime's workers.
    fn dispatch(&self, job: Job) {
        if self.is_current() {
            job();
        } else {
            self.post(job);
        }
    }

    fn set_timer(&self, deadline: Instant, waker: Waker, cancelled: Arc<AtomicBool>) {
        let sent = self.shared.reactor.send(Command::SetTimer {
            deadline,
            waker,
            cancelled,
        });

        if !sent {
            tracing::debug!("timer dropped: reactor already shut down");
        }
    }
}
