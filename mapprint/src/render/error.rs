//! Render error types.

use thiserror::Error;

use crate::composer::ComposeError;
use crate::executor::ExecutorError;
use crate::layer::{LayerError, SelectionError};

/// Errors that end a render call.
///
/// Every failure aborts the whole render; no partial output is returned.
/// The message of the error that triggered the failure is kept verbatim.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Layer selection failed before any tile was requested
    #[error(transparent)]
    Config(#[from] SelectionError),

    /// A tile could not be fetched or decoded
    #[error("{0}")]
    Fetch(LayerError),

    /// A decoration failed to draw
    #[error("{0}")]
    Draw(LayerError),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Render cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Nothing to render: the job has no pages")]
    NoPages,
}

impl RenderError {
    /// Whether the render stopped because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RenderError::Cancelled)
    }
}

impl From<ComposeError> for RenderError {
    fn from(err: ComposeError) -> Self {
        match err {
            ComposeError::Draw(e) => RenderError::Draw(e),
            ComposeError::Canvas { .. } => RenderError::Internal(err.to_string()),
            ComposeError::Encode(reason) => RenderError::Encode(reason),
        }
    }
}

impl From<ExecutorError> for RenderError {
    fn from(err: ExecutorError) -> Self {
        RenderError::Internal(err.to_string())
    }
}
