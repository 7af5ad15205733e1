//! Layer error types

use thiserror::Error;

use super::http::HttpError;

/// Errors produced while planning, fetching or drawing a layer's tiles.
#[derive(Debug, Clone, Error)]
pub enum LayerError {
    /// Tile download failed
    #[error("{0}")]
    Http(#[from] HttpError),

    /// Downloaded bytes are not a decodable image
    #[error("Failed to decode tile {url}: {reason}")]
    Decode { url: String, reason: String },

    /// A decoration could not draw onto the page canvas
    #[error("Failed to draw {layer}: {reason}")]
    Draw { layer: String, reason: String },

    /// The layer cannot plan tiles for this page
    #[error("Layer {layer} cannot print this page: {reason}")]
    Plan { layer: String, reason: String },

    /// Loading was aborted before the tile settled
    #[error("Tile loading aborted")]
    Aborted,

    /// The fetch task panicked or was lost
    #[error("Tile task failed: {0}")]
    Task(String),
}

impl LayerError {
    pub fn draw(layer: impl Into<String>, reason: impl ToString) -> Self {
        Self::Draw {
            layer: layer.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error is a consequence of cancellation rather than a
    /// failure of its own.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_message_is_verbatim() {
        let err: LayerError = HttpError::Status {
            status: 404,
            url: "https://tiles.example/1/2/3.png".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "HTTP 404 from https://tiles.example/1/2/3.png"
        );
    }

    #[test]
    fn test_is_aborted() {
        assert!(LayerError::Aborted.is_aborted());
        assert!(!LayerError::draw("Grid", "bad path").is_aborted());
        assert_eq!(
            LayerError::draw("Grid", "bad path").to_string(),
            "Failed to draw Grid: bad path"
        );
    }
}
