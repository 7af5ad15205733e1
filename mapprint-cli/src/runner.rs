//! CLI runner for common setup and operations.
//!
//! Encapsulates logging initialization, the async runtime, and file
//! operations shared by command handlers.

use std::future::Future;
use std::io::IsTerminal;
use std::path::Path;

use mapprint::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    runtime: Runtime,
}

impl CliRunner {
    /// Create a new CLI runner with optional debug logging.
    ///
    /// Stdout logging is only enabled when stdout is not a terminal, so the
    /// progress line stays readable in interactive use.
    pub fn with_debug(debug_mode: bool) -> Result<Self, CliError> {
        let stdout_enabled = !std::io::stdout().is_terminal();

        let logging_guard = init_logging(
            default_log_dir(),
            default_log_file(),
            stdout_enabled,
            debug_mode,
        )
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let runtime = Runtime::new().map_err(CliError::Runtime)?;

        Ok(Self {
            logging_guard,
            runtime,
        })
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("mapprint v{}", mapprint::VERSION);
        info!("mapprint CLI: {} command", command);
    }

    /// Run a future to completion on the runner's multi-thread runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Spawn a background task on the runner's runtime.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(future);
    }

    /// Write output bytes to `path`.
    pub fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), CliError> {
        std::fs::write(path, data).map_err(|error| CliError::FileWrite {
            path: path.to_path_buf(),
            error,
        })?;
        info!(path = %path.display(), bytes = data.len(), "Output written");
        println!("Saved {}", path.display());
        Ok(())
    }
}
