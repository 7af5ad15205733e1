//! CLI error handling with user-friendly messages.

use std::path::PathBuf;
use std::process;

use mapprint::config::ConfigFileError;
use mapprint::decoration::FontError;
use mapprint::layer::HttpError;
use mapprint::render::RenderError;
use thiserror::Error;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to load job file: {0}")]
    Config(#[from] ConfigFileError),

    #[error("Failed to load caption font: {0}")]
    Font(#[from] FontError),

    #[error("{0}")]
    Http(#[from] HttpError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to write file '{}': {error}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!();
        eprintln!("Error: {}", self);

        match self {
            CliError::Render(RenderError::Fetch(_)) => {
                eprintln!();
                eprintln!("Check the layer URLs and your network connection.");
                eprintln!("Lower [job] max_active if the tile server throttles requests.");
            }
            CliError::Render(RenderError::Config(_)) => {
                eprintln!();
                eprintln!("Set print = true on the base layer or add another base layer.");
            }
            _ => {}
        }

        process::exit(1)
    }
}
