//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Set to any value to print the library's `tracing` output while testing.
/// The filter itself follows `RUST_LOG` and defaults to `cosync=trace`.
pub const TEST_LOG_ENV: &str = "COSYNC_TEST_LOG";

static INIT_LOGGING: Once = Once::new();

/// Installs a test subscriber when `COSYNC_TEST_LOG` is set.
pub fn init_test_logging() {
    if std::env::var_os(TEST_LOG_ENV).is_none() {
        return;
    }

    INIT_LOGGING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cosync=trace"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}
