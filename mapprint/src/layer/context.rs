//! Per-(layer, zoom) render context.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::coord::PixelBounds;

/// Scratch viewport for one raster layer at one zoom on one page.
///
/// Created by the scheduler right before the layer's tiles are planned and
/// handed to the layer behind an `Arc`. Fetches keep a clone until they
/// settle; dropping the last clone tears the context down. The
/// cancellation token is a child of the page's token, so a failed page
/// stops every context at once.
#[derive(Debug)]
pub struct RenderContext {
    layer: String,
    zoom: u8,
    viewport: PixelBounds,
    cancellation: CancellationToken,
}

impl RenderContext {
    pub fn new(
        layer: impl Into<String>,
        zoom: u8,
        viewport: PixelBounds,
        page_token: &CancellationToken,
    ) -> Self {
        let layer = layer.into();
        debug!(layer = %layer, zoom = zoom, "Render context created");
        Self {
            layer,
            zoom,
            viewport,
            cancellation: page_token.child_token(),
        }
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Page bounds in pixel space at this context's zoom.
    pub fn viewport(&self) -> PixelBounds {
        self.viewport
    }

    /// Viewport size in whole pixels.
    pub fn size(&self) -> (u32, u32) {
        (
            self.viewport.width().ceil().max(0.0) as u32,
            self.viewport.height().ceil().max(0.0) as u32,
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Completes once the context is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// Stops every fetch using this context.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.cancellation.cancel();
        debug!(layer = %self.layer, zoom = self.zoom, "Render context torn down");
    }
}
