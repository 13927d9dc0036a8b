//! # Runtime
//!
//! Builds the multithreaded [Tokio](https://tokio.rs) runtime the server runs on,
//! sized from the `[runtime]` configuration section.
//!
//! ## Example
//!
//! ```rust
//! use evreg_domain::config::RuntimeSettings;
//!
//! let runtime = evreg_runtime::build_runtime(&RuntimeSettings::default())?;
//! runtime.block_on(async {
//!     tokio::task::yield_now().await;
//! });
//! # Ok::<(), anyhow::Error>(())
//! ```

pub use anyhow::Result;

use anyhow::anyhow;
use evreg_domain::config::RuntimeSettings;
use std::{thread::available_parallelism, time::Duration};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// The number of worker threads if detection fails.
const DEFAULT_WORKER_THREADS: usize = 4;
const MAX_WORKER_THREADS: usize = 1024;
/// Minimum allowed stack size (1 `MiB`).
const MIN_STACK_SIZE: usize = 1024 * 1024;
/// Maximum allowed stack size (16 `MiB`).
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
/// How long an idle blocking thread stays alive.
const THREAD_KEEP_ALIVE: Duration = Duration::from_secs(60);
const DEFAULT_THREAD_NAME: &str = "evreg-worker";

/// Runtime parameters after clamping to safe bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePlan {
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
}

impl RuntimePlan {
    /// Resolves configured values, falling back to detected parallelism for the worker count.
    #[must_use]
    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        let worker_threads = settings
            .worker_threads
            .unwrap_or_else(detect_worker_threads)
            .clamp(1, MAX_WORKER_THREADS);

        let thread_name = if settings.thread_name.trim().is_empty() {
            DEFAULT_THREAD_NAME.to_owned()
        } else {
            settings.thread_name.clone()
        };

        Self {
            worker_threads,
            stack_size: settings.stack_size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE),
            thread_name,
        }
    }
}

fn detect_worker_threads() -> usize {
    available_parallelism().map_or(DEFAULT_WORKER_THREADS, std::num::NonZero::get)
}

/// Creates the service runtime from configuration.
///
/// # Errors
///
/// Returns an [`anyhow::Error`] if the Tokio runtime cannot be created, typically due to
/// OS-level limits on thread creation.
pub fn build_runtime(settings: &RuntimeSettings) -> Result<Runtime> {
    let plan = RuntimePlan::from_settings(settings);
    debug!(?plan, "Building tokio runtime");

    let mut builder = Builder::new_multi_thread();
    builder
        .worker_threads(plan.worker_threads)
        .thread_name(&plan.thread_name)
        .thread_stack_size(plan.stack_size)
        .thread_keep_alive(THREAD_KEEP_ALIVE)
        .enable_all();

    builder.build().map_err(|e| anyhow!("Failed to initialize runtime: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_threads_are_clamped() {
        let settings = RuntimeSettings { worker_threads: Some(0), ..RuntimeSettings::default() };
        assert_eq!(RuntimePlan::from_settings(&settings).worker_threads, 1);

        let settings = RuntimeSettings { worker_threads: Some(2000), ..RuntimeSettings::default() };
        assert_eq!(RuntimePlan::from_settings(&settings).worker_threads, MAX_WORKER_THREADS);
    }

    #[test]
    fn detected_parallelism_is_used_when_unset() {
        let plan = RuntimePlan::from_settings(&RuntimeSettings::default());
        assert!(plan.worker_threads >= 1);
    }

    #[test]
    fn stack_size_and_name_are_normalized() {
        let settings = RuntimeSettings {
            worker_threads: Some(2),
            thread_name: "   ".to_owned(),
            stack_size: 100,
        };
        let plan = RuntimePlan::from_settings(&settings);
        assert_eq!(plan.stack_size, MIN_STACK_SIZE);
        assert_eq!(plan.thread_name, DEFAULT_THREAD_NAME);

        let settings = RuntimeSettings { stack_size: 100 * 1024 * 1024, ..settings };
        assert_eq!(RuntimePlan::from_settings(&settings).stack_size, MAX_STACK_SIZE);
    }

    #[test]
    fn runtime_runs_futures() {
        let settings = RuntimeSettings { worker_threads: Some(1), ..RuntimeSettings::default() };
        let runtime = build_runtime(&settings).expect("runtime");
        assert_eq!(runtime.block_on(async { 40 + 2 }), 42);
    }
}
