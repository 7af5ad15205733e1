//! URL-template raster layer
//!
//! Serves any slippy-map tile server addressed as `{z}/{x}/{y}`, with
//! optional `{s}` subdomain rotation. Zooms above `max_zoom` are served by
//! stretching parent tiles.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, trace};

use super::context::RenderContext;
use super::error::LayerError;
use super::http::AsyncHttpClient;
use super::types::{
    LayerOptions, RasterLayer, RasterTile, TileInfo, TilePlan, TileResult, TileToken,
    RASTER_PROGRESS_WEIGHT,
};
use crate::composer::decode_tile;
use crate::coord::{PixelPoint, MAX_ZOOM, TILE_SIZE};
use crate::job::PrintOptions;

/// Raster layer over a `{z}/{x}/{y}` tile URL template.
#[derive(Clone)]
pub struct XyzLayer<C> {
    client: C,
    options: LayerOptions,
    url_template: String,
    subdomains: Vec<String>,
    tile_size: u32,
    max_zoom: u8,
    weight: f64,
}

impl<C: AsyncHttpClient + Clone + 'static> XyzLayer<C> {
    pub fn new(client: C, url_template: impl Into<String>, options: LayerOptions) -> Self {
        Self {
            client,
            options,
            url_template: url_template.into(),
            subdomains: Vec::new(),
            tile_size: TILE_SIZE,
            max_zoom: MAX_ZOOM,
            weight: RASTER_PROGRESS_WEIGHT,
        }
    }

    /// Values substituted for `{s}`, rotated by tile address.
    pub fn with_subdomains(mut self, subdomains: Vec<String>) -> Self {
        self.subdomains = subdomains;
        self
    }

    /// Native tile edge in pixels; 512 means high-density tiles.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size.max(1);
        self
    }

    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Ratio of native tile pixels to standard 256-pixel tiles.
    pub fn tile_scale(&self) -> f64 {
        self.tile_size as f64 / TILE_SIZE as f64
    }

    /// Download URL for tile (`x`, `y`) at `zoom`.
    pub fn tile_url(&self, x: u32, y: u32, zoom: u8) -> String {
        let mut url = self
            .url_template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string());

        if !self.subdomains.is_empty() {
            let index = (x as usize + y as usize) % self.subdomains.len();
            url = url.replace("{s}", &self.subdomains[index]);
        }
        url
    }

    fn plan(&self, options: &PrintOptions, context: Arc<RenderContext>) -> TilePlan {
        let zoom = options.zoom;
        let source_zoom = zoom.min(self.max_zoom);
        let span = TILE_SIZE as f64 * 2.0_f64.powi((zoom - source_zoom) as i32);
        let tiles_per_axis = 1_i64 << source_zoom;
        let bounds = options.pixel_bounds_at(zoom);

        let first_col = (bounds.min.x / span).floor() as i64;
        let last_col = (bounds.max.x / span).ceil() as i64 - 1;
        let first_row = ((bounds.min.y / span).floor() as i64).max(0);
        let last_row = ((bounds.max.y / span).ceil() as i64 - 1).min(tiles_per_axis - 1);

        let mut addresses = Vec::new();
        for row in first_row..=last_row {
            for col in first_col..=last_col {
                addresses.push((col, row));
            }
        }

        debug!(
            layer = %self.options.short_name,
            zoom = zoom,
            source_zoom = source_zoom,
            tiles = addresses.len(),
            "Planned raster tiles"
        );

        let count = addresses.len();
        let layer = self.clone();
        let tile_scale = self.tile_scale();
        let tiles = addresses.into_iter().map(move |(col, row)| {
            let x = col.rem_euclid(tiles_per_axis) as u32;
            let y = row as u32;
            let url = layer.tile_url(x, y, source_zoom);
            let tile_pos = PixelPoint::new(
                col as f64 * span - bounds.min.x,
                row as f64 * span - bounds.min.y,
            );
            let placement = Placement {
                tile_pos,
                tile_size: span,
                zoom,
                tile_scale,
            };
            TileToken::spawn(fetch_tile(
                layer.client.clone(),
                url,
                Arc::clone(&context),
                placement,
            ))
        });

        TilePlan::new(tiles, count).with_tile_scale(tile_scale)
    }
}

impl<C: AsyncHttpClient + Clone + 'static> RasterLayer for XyzLayer<C> {
    fn options(&self) -> &LayerOptions {
        &self.options
    }

    fn progress_weight(&self) -> f64 {
        self.weight
    }

    fn clone_for_print(&self) -> Arc<dyn RasterLayer> {
        Arc::new(self.clone())
    }

    fn tiles_info<'a>(
        &'a self,
        options: &'a PrintOptions,
        context: Arc<RenderContext>,
    ) -> BoxFuture<'a, Result<TilePlan, LayerError>> {
        Box::pin(async move { Ok(self.plan(options, context)) })
    }
}

struct Placement {
    tile_pos: PixelPoint,
    tile_size: f64,
    zoom: u8,
    tile_scale: f64,
}

async fn fetch_tile<C: AsyncHttpClient>(
    client: C,
    url: String,
    context: Arc<RenderContext>,
    placement: Placement,
) -> TileResult {
    let bytes = tokio::select! {
        biased;
        _ = context.cancelled() => return Err(LayerError::Aborted),
        result = client.get(&url) => result?,
    };
    trace!(url = %url, bytes = bytes.len(), "Tile downloaded");

    let image = tokio::task::spawn_blocking(move || decode_tile(&bytes))
        .await
        .map_err(|e| LayerError::Task(e.to_string()))?
        .map_err(|reason| LayerError::Decode {
            url: url.clone(),
            reason,
        })?;

    Ok(TileInfo::Raster(RasterTile {
        image,
        tile_pos: placement.tile_pos,
        tile_size: placement.tile_size,
        zoom: placement.zoom,
        tile_scale: placement.tile_scale,
    }))
}
