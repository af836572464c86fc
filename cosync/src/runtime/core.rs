use super::executor::core::{Executor, start};
use super::handle::Handle;
use super::task::JoinHandle;
use crate::reactor::ReactorHandle;
use crate::reactor::command::Command;

use std::io;
use std::sync::mpsc;
use std::thread::JoinHandle as ThreadHandle;

/// A multi-threaded work-stealing runtime with its own timer thread.
///
/// Built by [`RuntimeBuilder`](crate::RuntimeBuilder). The runtime owns
/// its threads: they stop when [`shutdown`](Self::shutdown) is called or
/// the value is dropped. Other threads reach it through its [`Handle`].
pub struct Runtime {
    executor: Executor,
    reactor: ReactorHandle,
    reactor_thread: Option<ThreadHandle<()>>,
}

impl Runtime {
    pub(crate) fn new(worker_threads: usize, thread_name: &str) -> io::Result<Self> {
        let (executor, reactor, reactor_thread) = start(worker_threads, thread_name)?;

        tracing::debug!(worker_threads, thread_name, "runtime started");

        Ok(Self {
            executor,
            reactor,
            reactor_thread: Some(reactor_thread),
        })
    }

    /// The runtime's [`Schedule`](crate::runtime::Schedule) implementation,
    /// suitable for `lock_on` and `acquire_on`.
    pub fn handle(&self) -> &Handle {
        self.executor.handle()
    }

    /// Spawns `future` onto the pool. Same as `self.handle().spawn(future)`.
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        self.handle().spawn(future)
    }

    /// Runs `future` on the pool and blocks the calling thread until it
    /// returns.
    ///
    /// # Panics
    ///
    /// Panics if the future never delivers its output, for example
    /// because it panicked on a worker.
    ///
    /// ```rust,ignore
    /// let runtime = RuntimeBuilder::new().build();
    /// assert_eq!(runtime.block_on(async { 6 * 7 }), 42);
    /// ```
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();

        drop(self.spawn(async move {
            let _ = sender.send(future.await);
        }));

        receiver
            .recv()
            .expect("block_on: the future was dropped before completing")
    }

    /// Stops the runtime and joins its threads. Unfinished tasks are
    /// dropped without another poll.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.executor.shutdown();

        if !self.reactor.send(Command::Shutdown) {
            tracing::debug!("reactor already gone at shutdown");
        }

        self.executor.join();

        if let Some(thread) = self.reactor_thread.take()
            && thread.join().is_err()
        {
            tracing::error!("reactor thread panicked");
        }

        tracing::debug!("runtime stopped");
    }
}
