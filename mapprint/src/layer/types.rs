//! Tile source contract shared by raster and decoration layers.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tiny_skia::Pixmap;
use tokio::task::JoinHandle;

use super::context::RenderContext;
use super::error::LayerError;
use crate::coord::PixelPoint;
use crate::job::PrintOptions;

/// Progress weight of a raster layer, per page.
pub const RASTER_PROGRESS_WEIGHT: f64 = 1.0;

/// Progress weight of a decoration layer, per page.
pub const DECORATION_PROGRESS_WEIGHT: f64 = 0.01;

/// Result carried by a tile token once it settles.
pub type TileResult = Result<TileInfo, LayerError>;

/// Draw callback of a synthetic tile.
pub type DrawFn = Box<dyn FnOnce(&mut Pixmap) -> Result<(), LayerError> + Send>;

/// Capability flags of a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerOptions {
    /// Short tag used in output file names.
    pub short_name: String,
    /// Layer may be printed at all.
    pub print: bool,
    /// Layer is drawn over a base layer.
    pub is_overlay: bool,
    /// Overlay has a transparent background and darkens what is below.
    pub is_overlay_transparent: bool,
    /// Content changes with zoom (uses the map zoom instead of the satellite zoom).
    pub scale_dependent: bool,
}

impl LayerOptions {
    /// A printable base layer.
    pub fn base(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            print: true,
            is_overlay: false,
            is_overlay_transparent: false,
            scale_dependent: false,
        }
    }

    /// A printable overlay layer.
    pub fn overlay(short_name: impl Into<String>) -> Self {
        Self {
            is_overlay: true,
            ..Self::base(short_name)
        }
    }

    pub fn with_print(mut self, print: bool) -> Self {
        self.print = print;
        self
    }

    pub fn with_transparency(mut self, transparent: bool) -> Self {
        self.is_overlay_transparent = transparent;
        self
    }

    pub fn with_scale_dependent(mut self, scale_dependent: bool) -> Self {
        self.scale_dependent = scale_dependent;
        self
    }
}

/// A decoded raster tile placed relative to the page.
pub struct RasterTile {
    pub image: Pixmap,
    /// Top-left corner in source-zoom pixels, relative to the page's
    /// north-west corner.
    pub tile_pos: PixelPoint,
    /// Edge length in source-zoom pixels.
    pub tile_size: f64,
    pub zoom: u8,
    pub tile_scale: f64,
}

impl fmt::Debug for RasterTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterTile")
            .field("image", &(self.image.width(), self.image.height()))
            .field("tile_pos", &self.tile_pos)
            .field("tile_size", &self.tile_size)
            .field("zoom", &self.zoom)
            .field("tile_scale", &self.tile_scale)
            .finish()
    }
}

/// Vector content drawn straight onto a page-sized canvas.
pub struct SyntheticTile {
    pub draw: DrawFn,
    /// Drawn opaque over the page instead of multiply-blended.
    pub overlay_solid: bool,
}

impl SyntheticTile {
    pub fn new<F>(overlay_solid: bool, draw: F) -> Self
    where
        F: FnOnce(&mut Pixmap) -> Result<(), LayerError> + Send + 'static,
    {
        Self {
            draw: Box::new(draw),
            overlay_solid,
        }
    }
}

impl fmt::Debug for SyntheticTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticTile")
            .field("overlay_solid", &self.overlay_solid)
            .finish_non_exhaustive()
    }
}

/// What a settled tile token delivers to the compositor.
#[derive(Debug)]
pub enum TileInfo {
    Raster(RasterTile),
    Synthetic(SyntheticTile),
    /// Nothing to draw (missing tile, empty layer).
    Empty,
}

enum TokenState {
    Ready(TileResult),
    Loading(JoinHandle<TileResult>),
}

/// A pending tile: a running fetch plus the means to abort it.
///
/// Settling consumes the token. Aborting (explicitly, or by dropping an
/// unsettled token) cancels the fetch and runs the abort hook exactly once.
pub struct TileToken {
    state: Option<TokenState>,
    on_abort: Option<Box<dyn FnOnce() + Send>>,
}

impl TileToken {
    /// Starts fetching on the tokio runtime immediately.
    pub fn spawn<F>(fetch: F) -> Self
    where
        F: Future<Output = TileResult> + Send + 'static,
    {
        Self {
            state: Some(TokenState::Loading(tokio::spawn(fetch))),
            on_abort: None,
        }
    }

    /// A token that is already settled with `info`.
    pub fn ready(info: TileInfo) -> Self {
        Self {
            state: Some(TokenState::Ready(Ok(info))),
            on_abort: None,
        }
    }

    /// A token that is already settled with an error.
    pub fn failed(error: LayerError) -> Self {
        Self {
            state: Some(TokenState::Ready(Err(error))),
            on_abort: None,
        }
    }

    /// Registers a hook run if the token is aborted before it settles.
    pub fn on_abort<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_abort = Some(Box::new(hook));
        self
    }

    /// Waits for the tile.
    ///
    /// If this future is dropped before it completes, the token is aborted.
    pub async fn settle(mut self) -> TileResult {
        if let Some(TokenState::Loading(handle)) = &mut self.state {
            let joined = handle.await;
            self.state = Some(TokenState::Ready(match joined {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(LayerError::Aborted),
                Err(e) => Err(LayerError::Task(e.to_string())),
            }));
        }

        self.on_abort = None;
        match self.state.take() {
            Some(TokenState::Ready(result)) => result,
            _ => Err(LayerError::Aborted),
        }
    }

    /// Cancels the fetch and runs the abort hook.
    pub fn abort(mut self) {
        self.cancel_loading();
    }

    fn cancel_loading(&mut self) {
        if let Some(TokenState::Loading(handle)) = self.state.take() {
            handle.abort();
        }
        if let Some(hook) = self.on_abort.take() {
            hook();
        }
    }
}

impl Drop for TileToken {
    fn drop(&mut self) {
        self.cancel_loading();
    }
}

impl fmt::Debug for TileToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            Some(TokenState::Ready(Ok(_))) => "ready",
            Some(TokenState::Ready(Err(_))) => "failed",
            Some(TokenState::Loading(_)) => "loading",
            None => "done",
        };
        f.debug_struct("TileToken").field("state", &state).finish()
    }
}

/// A layer's tiles for one page at one zoom.
///
/// `tiles` is lazy: a token (and its fetch) is created only when pulled.
pub struct TilePlan {
    pub tiles: Box<dyn Iterator<Item = TileToken> + Send>,
    pub count: usize,
    pub tile_scale: f64,
}

impl TilePlan {
    pub fn new<I>(tiles: I, count: usize) -> Self
    where
        I: Iterator<Item = TileToken> + Send + 'static,
    {
        Self {
            tiles: Box::new(tiles),
            count,
            tile_scale: 1.0,
        }
    }

    pub fn with_tile_scale(mut self, tile_scale: f64) -> Self {
        self.tile_scale = tile_scale;
        self
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty(), 0)
    }

    /// Plan made of already-settled synthetic tiles.
    pub fn synthetic(tiles: Vec<SyntheticTile>) -> Self {
        let count = tiles.len();
        Self::new(
            tiles
                .into_iter()
                .map(|tile| TileToken::ready(TileInfo::Synthetic(tile))),
            count,
        )
    }
}

impl fmt::Debug for TilePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TilePlan")
            .field("count", &self.count)
            .field("tile_scale", &self.tile_scale)
            .finish_non_exhaustive()
    }
}

/// A layer that fetches raster tiles.
pub trait RasterLayer: Send + Sync {
    fn options(&self) -> &LayerOptions;

    fn progress_weight(&self) -> f64 {
        RASTER_PROGRESS_WEIGHT
    }

    /// Returns a copy that shares no I/O state with the live layer.
    fn clone_for_print(&self) -> Arc<dyn RasterLayer>;

    /// Plans the page's tiles at `options.zoom`.
    ///
    /// Fetches started by the plan's tokens should stop once `context` is
    /// cancelled and must keep `context` alive until they settle.
    fn tiles_info<'a>(
        &'a self,
        options: &'a PrintOptions,
        context: Arc<RenderContext>,
    ) -> BoxFuture<'a, Result<TilePlan, LayerError>>;
}

/// A layer that draws vector content instead of fetching images.
pub trait DecorationLayer: Send + Sync {
    fn options(&self) -> &LayerOptions;

    fn progress_weight(&self) -> f64 {
        DECORATION_PROGRESS_WEIGHT
    }

    /// Returns the draw units for one page, in draw order.
    fn tiles(&self, options: &PrintOptions) -> Result<Vec<SyntheticTile>, LayerError>;
}

/// Any printable layer.
#[derive(Clone)]
pub enum LayerKind {
    Raster(Arc<dyn RasterLayer>),
    Decoration(Arc<dyn DecorationLayer>),
}

impl LayerKind {
    pub fn raster(layer: impl RasterLayer + 'static) -> Self {
        Self::Raster(Arc::new(layer))
    }

    pub fn decoration(layer: impl DecorationLayer + 'static) -> Self {
        Self::Decoration(Arc::new(layer))
    }

    pub fn options(&self) -> &LayerOptions {
        match self {
            Self::Raster(layer) => layer.options(),
            Self::Decoration(layer) => layer.options(),
        }
    }

    pub fn short_name(&self) -> &str {
        &self.options().short_name
    }

    pub fn progress_weight(&self) -> f64 {
        match self {
            Self::Raster(layer) => layer.progress_weight(),
            Self::Decoration(layer) => layer.progress_weight(),
        }
    }

    /// Copy safe to hand to the scheduler. Decorations hold no I/O state and
    /// are shared as-is.
    pub fn clone_for_print(&self) -> Self {
        match self {
            Self::Raster(layer) => Self::Raster(layer.clone_for_print()),
            Self::Decoration(layer) => Self::Decoration(Arc::clone(layer)),
        }
    }
}

impl fmt::Debug for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Raster(_) => "Raster",
            Self::Decoration(_) => "Decoration",
        };
        f.debug_tuple(kind).field(self.options()).finish()
    }
}
