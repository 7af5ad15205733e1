//! Print job description
//!
//! A [`RenderJob`] is everything one render call needs: the pages to print,
//! the layers to draw on them, the zooms to fetch at, and output settings.
//! Jobs are read-only once built; the renderer never mutates them.
//!
//! ```text
//! RenderJob
//!   ├── pages[]          Page { geo_bounds, print_size, label }
//!   ├── layers[]         ActiveLayer { LayerKind, order key }
//!   ├── decorations[]    LayerKind::Decoration, drawn after layers
//!   ├── zooms            ZoomSelection { map_zoom, sat_zoom }
//!   └── resolution/scale/progress/cancellation
//! ```

mod page;
mod zoom;

pub use page::{mm_to_pixels, Margins, Orientation, Page, PaperSize, PrintSize, MM_PER_INCH};
pub use zoom::{reference_latitude, ZoomSelection};

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::coord::{pixel_bounds, CanvasProjection, LatLngBounds, PixelBounds, REFERENCE_ZOOM};
use crate::layer::{ActiveLayer, LayerKind};

/// Default number of tile tokens pulled ahead of the compositor.
pub const DEFAULT_MAX_ACTIVE: usize = 20;

/// Default JPEG quality for page rasters.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Progress callback: `(increment, total)`.
///
/// Called once per settled tile; increments for a successful job sum to
/// `total`.
pub type ProgressCallback = Arc<dyn Fn(f64, f64) + Send + Sync>;

/// Per-page, per-layer rendering parameters handed to tile sources.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    pub geo_bounds: LatLngBounds,
    /// Page bounds at [`REFERENCE_ZOOM`].
    pub pixel_bounds: PixelBounds,
    pub dest_width: u32,
    pub dest_height: u32,
    pub print_size: PrintSize,
    pub resolution: f64,
    pub scale: f64,
    /// Source zoom chosen for the layer being planned.
    pub zoom: u8,
    pub page_index: usize,
    pub pages_count: usize,
    pub page_label: String,
}

impl PrintOptions {
    pub fn for_page(
        page: &Page,
        page_index: usize,
        pages_count: usize,
        resolution: f64,
        scale: f64,
    ) -> Self {
        let (dest_width, dest_height) = page.pixel_size(resolution);
        Self {
            geo_bounds: page.geo_bounds,
            pixel_bounds: pixel_bounds(&page.geo_bounds, REFERENCE_ZOOM),
            dest_width,
            dest_height,
            print_size: page.print_size,
            resolution,
            scale,
            zoom: REFERENCE_ZOOM,
            page_index,
            pages_count,
            page_label: page.label.clone(),
        }
    }

    /// Same page, planned at another source zoom.
    pub fn at_zoom(&self, zoom: u8) -> Self {
        Self {
            zoom,
            ..self.clone()
        }
    }

    /// Page bounds in pixel space at `zoom`.
    pub fn pixel_bounds_at(&self, zoom: u8) -> PixelBounds {
        let shift = REFERENCE_ZOOM.saturating_sub(zoom) as i32;
        self.pixel_bounds.scaled_down(2.0_f64.powi(shift))
    }

    pub fn canvas_projection(&self) -> CanvasProjection {
        CanvasProjection::new(self.pixel_bounds, self.dest_width, self.dest_height)
    }

    /// Printed length in output pixels, unrounded.
    #[inline]
    pub fn mm_to_px(&self, mm: f64) -> f64 {
        mm * self.resolution / MM_PER_INCH
    }
}

/// One render call: pages, layers and output settings.
#[derive(Clone)]
pub struct RenderJob {
    pub pages: Vec<Page>,
    pub layers: Vec<ActiveLayer>,
    pub decorations: Vec<LayerKind>,
    pub zooms: ZoomSelection,
    pub resolution: f64,
    pub scale: f64,
    pub max_active: usize,
    pub jpeg_quality: u8,
    pub progress: Option<ProgressCallback>,
    pub cancellation: CancellationToken,
}

impl RenderJob {
    pub fn new(pages: Vec<Page>, zooms: ZoomSelection, resolution: f64, scale: f64) -> Self {
        Self {
            pages,
            layers: Vec::new(),
            decorations: Vec::new(),
            zooms,
            resolution,
            scale,
            max_active: DEFAULT_MAX_ACTIVE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            progress: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Adds an active layer with its draw-order key.
    pub fn with_layer(mut self, layer: LayerKind, order: Vec<i32>) -> Self {
        self.layers.push(ActiveLayer::new(layer, order));
        self
    }

    /// Adds a decoration, drawn on top of all layers in insertion order.
    pub fn with_decoration(mut self, decoration: LayerKind) -> Self {
        self.decorations.push(decoration);
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_max_active(mut self, max_active: usize) -> Self {
        self.max_active = max_active.max(1);
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Print options for page `index`, before a zoom is chosen.
    pub fn print_options(&self, index: usize) -> Option<PrintOptions> {
        self.pages.get(index).map(|page| {
            PrintOptions::for_page(
                page,
                index,
                self.pages.len(),
                self.resolution,
                self.scale,
            )
        })
    }
}

impl fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderJob")
            .field("pages", &self.pages.len())
            .field("layers", &self.layers.len())
            .field("decorations", &self.decorations.len())
            .field("zooms", &self.zooms)
            .field("resolution", &self.resolution)
            .field("scale", &self.scale)
            .field("max_active", &self.max_active)
            .finish()
    }
}
