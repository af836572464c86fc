use super::Runtime;

use std::env;
use std::thread;

/// Environment variable overriding the default number of worker threads.
pub const WORKER_THREADS_ENV: &str = "COSYNC_WORKER_THREADS";

const DEFAULT_THREAD_NAME: &str = "cosync-worker";

/// Builder for configuring and creating a runtime.
///
/// `RuntimeBuilder` allows customizing runtime parameters before
/// constructing the runtime: the number of worker threads and the
/// name given to the runtime's threads.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .worker_threads(4)
///     .thread_name("db-pool")
///     .build();
/// ```
pub struct RuntimeBuilder {
    /// Number of worker threads in the executor.
    worker_threads: usize,

    /// Prefix of the worker and reactor thread names.
    thread_name: String,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` with default configuration.
    ///
    /// By default, the number of worker threads is read from
    /// `COSYNC_WORKER_THREADS` when it holds a positive integer, and
    /// otherwise set to the number of available logical CPUs, falling
    /// back to `1` if unavailable.
    pub fn new() -> Self {
        let worker_threads = env::var(WORKER_THREADS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });

        Self {
            worker_threads,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }

    /// Sets the number of worker threads used by the runtime.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the prefix used to name the runtime's threads.
    ///
    /// Workers are named `{prefix}-{id}` and the reactor
    /// `{prefix}-reactor`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Builds the runtime with the configured options.
    ///
    /// This starts the reactor and initializes the executor.
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses to spawn the runtime's
    /// threads. Use [`try_build`](Self::try_build) to handle that case.
    pub fn build(self) -> Runtime {
        self.try_build().expect("failed to start runtime threads")
    }

    /// Builds the runtime, returning an error if a thread cannot be spawned.
    pub fn try_build(self) -> std::io::Result<Runtime> {
        Runtime::new(self.worker_threads, &self.thread_name)
    }
}

impl Default for RuntimeBuilder {
    /// Creates a default `RuntimeBuilder`.
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_positive() {
        let builder = RuntimeBuilder::new();

        assert!(builder.worker_threads > 0);
        assert_eq!(builder.thread_name, DEFAULT_THREAD_NAME);
    }

    #[test]
    fn test_thread_name_override() {
        let builder = RuntimeBuilder::new().worker_threads(3).thread_name("pool");

        assert_eq!(builder.worker_threads, 3);
        assert_eq!(builder.thread_name, "pool");
    }

    #[test]
    #[should_panic(expected = "worker_threads must be > 0")]
    fn test_zero_worker_threads_panics() {
        let _ = RuntimeBuilder::new().worker_threads(0);
    }
}
