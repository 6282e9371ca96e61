//! Test utilities for the Proteus workspace
//!
//! Common fixtures and helpers shared by the integration tests and benches.
//!
//! - **Test Environment**: isolated input/output directories with automatic cleanup
//! - **Fixtures**: seeded synthetic embedding matrices and identifier lists
//! - **Assertions**: readers and checks for the cluster and novelty tables

pub mod assertions;
pub mod environment;
pub mod fixtures;

// Re-export commonly used items
pub use assertions::{assert_tables_aligned, read_cluster_table, read_novelty_table, ClusterRow, NoveltyRow};
pub use environment::{TestConfig, TestEnvironment};
pub use fixtures::{gaussian_blobs, identical_rows, read_ids, BlobSpec};

// Re-export test dependencies for convenience
pub use anyhow::{Context, Result};
pub use tempfile;

use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize test logging (safe to call from every test)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PROTEUS_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

#[derive(Clone)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a subscriber scoped to the current thread and return its
/// result together with everything logged at WARN and above
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = SharedBuffer(Arc::new(Mutex::new(Vec::new())));
    let sink = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::WARN)
        .with_ansi(false)
        .without_time()
        .with_writer(move || sink.clone())
        .finish();

    let result = {
        let _guard = subscriber.set_default();
        f()
    };
    let logs = buffer
        .0
        .lock()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    (result, logs)
}

/// Run a test with a clean environment
///
/// # Example
/// ```rust
/// use proteus_test::with_test_env;
///
/// with_test_env(|env| {
///     assert!(env.inputs_dir().exists());
///     Ok(())
/// })
/// .unwrap();
/// ```
pub fn with_test_env<F, R>(f: F) -> Result<R>
where
    F: FnOnce(&TestEnvironment) -> Result<R>,
{
    let env = TestEnvironment::new()?;
    f(&env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_warnings_keeps_warn_and_above() {
        let (value, logs) = capture_warnings(|| {
            tracing::info!("routine progress");
            tracing::warn!("rows were dropped");
            7
        });
        assert_eq!(value, 7);
        assert!(logs.contains("rows were dropped"));
        assert!(!logs.contains("routine progress"));
    }
}
