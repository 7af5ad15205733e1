//! Printable layers
//!
//! Every layer offers its content for a page through one contract: given
//! [`PrintOptions`](crate::job::PrintOptions) at a source zoom, return a
//! lazy [`TilePlan`] of [`TileToken`]s. Raster layers fetch images inside a
//! per-(layer, zoom) [`RenderContext`]; decorations return already-settled
//! synthetic tiles that draw straight onto the page.
//!
//! ```text
//! LayerKind::Raster ──► tiles_info(options, ctx) ──► TileToken (spawned fetch)
//! LayerKind::Decoration ──► tiles(options) ──────► TileToken (ready, draw fn)
//! ```

mod context;
mod error;
pub mod http;
mod selector;
mod types;
mod xyz;

pub use context::RenderContext;
pub use error::LayerError;
pub use http::{AsyncHttpClient, AsyncReqwestClient, HttpError};
pub use selector::{select_print_layers, ActiveLayer, SelectionError};
pub use types::{
    DecorationLayer, DrawFn, LayerKind, LayerOptions, RasterLayer, RasterTile, SyntheticTile,
    TileInfo, TilePlan, TileResult, TileToken, DECORATION_PROGRESS_WEIGHT,
    RASTER_PROGRESS_WEIGHT,
};
pub use xyz::XyzLayer;
