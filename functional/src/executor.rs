//! Execution pools used by the non-blocking wait mode.

use std::sync::Arc;
use std::thread;

use once_cell::sync::Lazy;

/// A unit of work handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A trait for running type-erased work off the caller's thread.
pub trait Executor: Send + Sync + 'static {
  /// Schedules `job` to run to completion. There is no cancellation: once
  /// accepted, a job is expected to run.
  fn execute(&self, job: Job);
}

/// Runs jobs on rayon's global thread pool.
#[cfg(feature = "rayon")]
#[derive(Debug, Default, Clone, Copy)]
pub struct RayonExecutor;

#[cfg(feature = "rayon")]
impl Executor for RayonExecutor {
  fn execute(&self, job: Job) {
    rayon::spawn(job);
  }
}

/// Runs jobs on a Tokio runtime's blocking pool.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioExecutor(tokio::runtime::Handle);

#[cfg(feature = "tokio")]
impl TokioExecutor {
  /// Creates an executor that uses the current Tokio runtime context.
  /// Panics if called outside of a Tokio runtime.
  pub fn new() -> Self {
    Self(tokio::runtime::Handle::current())
  }

  pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
    Self(handle)
  }
}

#[cfg(feature = "tokio")]
impl Executor for TokioExecutor {
  fn execute(&self, job: Job) {
    // User callbacks are synchronous, so they belong on the blocking pool.
    drop(self.0.spawn_blocking(job));
  }
}

/// Spawns a dedicated OS thread per job. Always available; used as the
/// default when the `rayon` feature is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
  fn execute(&self, job: Job) {
    let spawned = thread::Builder::new()
      .name("fibre-functional-worker".into())
      .spawn(job);
    if let Err(e) = spawned {
      // The job is dropped with the failed spawn; its completion observes that.
      tracing::error!(error = %e, "failed to spawn worker thread");
    }
  }
}

static DEFAULT_EXECUTOR: Lazy<Arc<dyn Executor>> = Lazy::new(|| {
  #[cfg(feature = "rayon")]
  {
    Arc::new(RayonExecutor)
  }
  #[cfg(not(feature = "rayon"))]
  {
    Arc::new(ThreadExecutor)
  }
});

/// The process-wide executor shared by maps that were not given one.
pub(crate) fn default_executor() -> Arc<dyn Executor> {
  DEFAULT_EXECUTOR.clone()
}
