use crate::reactor::{Reactor, ReactorHandle};
use crate::runtime::executor::worker::Worker;
use crate::runtime::handle::Handle;
use crate::runtime::work_stealing::injector::Injector;
use crate::runtime::work_stealing::queue::LocalQueue;

use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

/// The worker pool of a runtime.
pub(crate) struct Executor {
    handle: Handle,
    threads: Vec<JoinHandle<()>>,
}

impl Executor {
    /// Spawns `count` workers named `{name}-{id}`.
    ///
    /// # Errors
    ///
    /// Fails if a thread cannot be spawned. Workers started before the
    /// failure are stopped and joined first.
    pub(crate) fn new(reactor: ReactorHandle, count: usize, name: &str) -> io::Result<Self> {
        let locals: Vec<_> = (0..count).map(|_| Arc::new(LocalQueue::new())).collect();
        let handle = Handle::new(Arc::new(Injector::new()), Arc::new(locals), reactor);

        let mut executor = Self {
            handle,
            threads: Vec::with_capacity(count),
        };

        for id in 0..count {
            let worker = Worker::new(id, executor.handle.clone());

            let thread = thread::Builder::new()
                .name(format!("{name}-{id}"))
                .spawn(move || worker.run());

            match thread {
                Ok(thread) => executor.threads.push(thread),
                Err(err) => {
                    tracing::error!(id, %err, "failed to spawn worker");
                    executor.shutdown();
                    executor.join();
                    return Err(err);
                }
            }
        }

        Ok(executor)
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Refuses new tasks and wakes every parked worker so it can exit.
    pub(crate) fn shutdown(&self) {
        self.handle.shared.shutdown.store(true, Ordering::Release);
        self.handle.shared.injector.shutdown();
    }

    pub(crate) fn join(&mut self) {
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}

/// Starts the reactor thread, then the workers that post timers to it.
pub(crate) fn start(
    count: usize,
    name: &str,
) -> io::Result<(Executor, ReactorHandle, JoinHandle<()>)> {
    let (reactor, reactor_thread) = Reactor::start(format!("{name}-reactor"))?;
    let executor = Executor::new(reactor.clone(), count, name)?;

    Ok((executor, reactor, reactor_thread))
}
