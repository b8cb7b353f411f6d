//! Blocking work offload
//!
//! The caller's runtime is a single-threaded loop; disk and codec work runs on
//! the runtime's bounded blocking pool and is awaited before the next step.

use crate::config::TimelapseConfig;
use crate::result::{TimelapseError, TimelapseResult};
use tokio::runtime::{Builder, Runtime};

/// Run `job` on the blocking pool and wait for it
///
/// A panicked or cancelled job surfaces as `TimelapseError::Worker`.
pub async fn run_blocking<F, T>(label: &'static str, job: F) -> TimelapseResult<T>
where
    F: FnOnce() -> TimelapseResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| TimelapseError::Worker {
            message: format!("{label}: {e}"),
        })?
}

/// Current-thread runtime whose blocking pool is capped by `worker_threads`
pub fn build_runtime(config: &TimelapseConfig) -> TimelapseResult<Runtime> {
    let runtime = Builder::new_current_thread()
        .enable_time()
        .max_blocking_threads(config.worker_threads.max(1))
        .thread_name("dremel-worker")
        .build()?;
    Ok(runtime)
}
