//! mapprint - Print-ready maps from slippy-map tile servers
//!
//! This library renders geographic pages into print rasters. Each page is
//! composited from tiled raster layers (street maps, satellite imagery,
//! transparent overlays) and vector decorations (grid, scale caption,
//! magnetic meridians), then written as baseline JPEGs or packed into a
//! multi-page PDF.
//!
//! # High-Level API
//!
//! ```ignore
//! use mapprint::executor::TokioExecutor;
//! use mapprint::job::{Page, RenderJob, ZoomSelection};
//! use mapprint::layer::{AsyncReqwestClient, LayerKind, LayerOptions, XyzLayer};
//! use mapprint::render::MapRenderer;
//!
//! let osm = XyzLayer::new(
//!     AsyncReqwestClient::new()?,
//!     "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
//!     LayerOptions::base("O"),
//! );
//! let job = RenderJob::new(pages, ZoomSelection::suggest(500.0, 300.0, 55.7), 300.0, 500.0)
//!     .with_layer(LayerKind::raster(osm), vec![]);
//!
//! let pdf = MapRenderer::new(TokioExecutor::new()).render_pdf(&job).await?;
//! ```

pub mod composer;
pub mod config;
pub mod coord;
pub mod decoration;
pub mod executor;
pub mod job;
pub mod layer;
pub mod logging;
pub mod pdf;
pub mod render;
pub mod scheduler;

/// Version of the mapprint library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
