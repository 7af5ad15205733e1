//! Blocking work off the async runtime.
//!
//! Page encoding is CPU-bound. The renderer hands it to a
//! [`BlockingExecutor`] so the controller loop, which only awaits tile
//! fetches, never stalls a runtime worker.
//!
//! ```text
//! ┌─────────────────────┐
//! │     MapRenderer     │
//! └─────────┬───────────┘
//!           │ depends on
//!           ▼
//! ┌─────────────────────┐
//! │  BlockingExecutor   │
//! └─────────┬───────────┘
//!           │ implemented by
//!           ▼
//! ┌─────────────────────┐
//! │   TokioExecutor     │  spawn_blocking
//! └─────────────────────┘
//! ```

use std::future::Future;
use std::pin::Pin;

/// Runs blocking closures on a thread pool.
pub trait BlockingExecutor: Send + Sync + 'static {
    fn execute_blocking<F, R>(
        &self,
        f: F,
    ) -> Pin<Box<dyn Future<Output = Result<R, ExecutorError>> + Send>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static;
}

/// Errors that can occur during executor operations.
#[derive(Debug, Clone)]
pub enum ExecutorError {
    /// A spawned task panicked
    TaskPanicked(String),
    /// Executor was shut down
    Shutdown,
}

impl std::fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorError::TaskPanicked(msg) => write!(f, "task panicked: {}", msg),
            ExecutorError::Shutdown => write!(f, "executor shut down"),
        }
    }
}

impl std::error::Error for ExecutorError {}

/// Tokio implementation over `spawn_blocking`.
#[derive(Clone, Default)]
pub struct TokioExecutor;

impl TokioExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl BlockingExecutor for TokioExecutor {
    fn execute_blocking<F, R>(
        &self,
        f: F,
    ) -> Pin<Box<dyn Future<Output = Result<R, ExecutorError>> + Send>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        Box::pin(async move {
            tokio::task::spawn_blocking(f).await.map_err(|e| {
                if e.is_cancelled() {
                    ExecutorError::Shutdown
                } else {
                    ExecutorError::TaskPanicked(e.to_string())
                }
            })
        })
    }
}

/// Runs "blocking" work immediately on the calling thread.
#[cfg(test)]
pub struct SyncExecutor;

#[cfg(test)]
impl BlockingExecutor for SyncExecutor {
    fn execute_blocking<F, R>(
        &self,
        f: F,
    ) -> Pin<Box<dyn Future<Output = Result<R, ExecutorError>> + Send>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let result = f();
        Box::pin(std::future::ready(Ok(result)))
    }
}
