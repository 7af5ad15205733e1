//! Layer-by-layer tile token source.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::job::{PrintOptions, ZoomSelection};
use crate::layer::{LayerError, LayerKind, RenderContext, TileInfo, TilePlan, TileToken};

/// A tile token tagged with what the compositor and progress accounting
/// need to know about it.
#[derive(Debug)]
pub struct PendingTile {
    pub token: TileToken,
    /// Position of the layer in draw order.
    pub layer_index: usize,
    pub layer: String,
    /// Source zoom; `None` for decorations.
    pub zoom: Option<u8>,
    pub tile_scale: f64,
    /// Progress increment reported once the token settles.
    pub progress_weight: f64,
}

/// The layer whose tiles are currently being handed out.
struct OpenLayer {
    index: usize,
    name: String,
    zoom: Option<u8>,
    tile_scale: f64,
    weight_per_tile: f64,
    tiles: Box<dyn Iterator<Item = TileToken> + Send>,
}

/// Yields every tile token of a page, layer after layer, in draw order.
///
/// Layers are planned lazily: a layer's plan (and, for raster layers, its
/// [`RenderContext`]) is created only once the previous layer's tokens
/// have all been pulled. Plans are lazy too, so a fetch starts when its
/// token is pulled.
pub struct LayerTileIterator {
    layers: std::iter::Enumerate<std::vec::IntoIter<LayerKind>>,
    options: PrintOptions,
    zooms: ZoomSelection,
    page_token: CancellationToken,
    current: Option<OpenLayer>,
    stopped: bool,
}

impl LayerTileIterator {
    /// `layers` must already be in draw order. `page_token` parents every
    /// render context; cancelling it stops every fetch of the page.
    pub fn new(
        layers: Vec<LayerKind>,
        options: PrintOptions,
        zooms: ZoomSelection,
        page_token: CancellationToken,
    ) -> Self {
        Self {
            layers: layers.into_iter().enumerate(),
            options,
            zooms,
            page_token,
            current: None,
            stopped: false,
        }
    }

    /// Next token in draw order, or `None` once every layer is exhausted or
    /// the iterator was stopped.
    pub async fn next(&mut self) -> Result<Option<PendingTile>, LayerError> {
        loop {
            if self.stopped || self.page_token.is_cancelled() {
                self.stop();
                return Ok(None);
            }

            if let Some(open) = self.current.as_mut() {
                if let Some(token) = open.tiles.next() {
                    return Ok(Some(PendingTile {
                        token,
                        layer_index: open.index,
                        layer: open.name.clone(),
                        zoom: open.zoom,
                        tile_scale: open.tile_scale,
                        progress_weight: open.weight_per_tile,
                    }));
                }
                trace!(layer = %open.name, "Layer tiles exhausted");
                self.current = None;
            }

            let Some((index, layer)) = self.layers.next() else {
                return Ok(None);
            };

            let opened = tokio::select! {
                biased;
                _ = self.page_token.cancelled() => None,
                opened = open_layer(index, layer, &self.options, self.zooms, &self.page_token) => {
                    Some(opened?)
                }
            };
            match opened {
                Some(open) => self.current = Some(open),
                None => {
                    self.stop();
                    return Ok(None);
                }
            }
        }
    }

    /// Ends the sequence. Tokens not yet pulled are never created.
    pub fn stop(&mut self) {
        if !self.stopped {
            debug!(page = self.options.page_index, "Layer tile iteration stopped");
        }
        self.stopped = true;
        self.current = None;
    }
}

/// Plans one layer for the page.
async fn open_layer(
    index: usize,
    layer: LayerKind,
    page_options: &PrintOptions,
    zooms: ZoomSelection,
    page_token: &CancellationToken,
) -> Result<OpenLayer, LayerError> {
    let options = layer.options().clone();
    let weight = layer.progress_weight();

    let (zoom, plan) = match &layer {
        LayerKind::Raster(raster) => {
            let zoom = zooms.for_layer(options.scale_dependent);
            let print_options = page_options.at_zoom(zoom);
            let context = Arc::new(RenderContext::new(
                options.short_name.clone(),
                zoom,
                print_options.pixel_bounds_at(zoom),
                page_token,
            ));
            let plan = raster.tiles_info(&print_options, context).await?;
            (Some(zoom), plan)
        }
        LayerKind::Decoration(decoration) => {
            (None, TilePlan::synthetic(decoration.tiles(page_options)?))
        }
    };

    debug!(
        page = page_options.page_index,
        layer = %options.short_name,
        zoom = ?zoom,
        tiles = plan.count,
        "Layer planned"
    );

    let TilePlan {
        tiles,
        count,
        tile_scale,
    } = plan;

    let (tiles, weight_per_tile): (Box<dyn Iterator<Item = TileToken> + Send>, f64) =
        if count == 0 {
            (
                Box::new(std::iter::once(TileToken::ready(TileInfo::Empty))),
                weight,
            )
        } else {
            (tiles, weight / count as f64)
        };

    Ok(OpenLayer {
        index,
        name: options.short_name.clone(),
        zoom,
        tile_scale,
        weight_per_tile,
        tiles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::LatLng;
    use crate::job::{Page, PrintSize};
    use crate::layer::{DecorationLayer, LayerOptions, SyntheticTile};
    use crate::scheduler::tests::StubRaster;

    fn options() -> PrintOptions {
        let page = Page::from_center(LatLng::new(10.0, 10.0), PrintSize::new(50.0, 50.0), 500.0, "1")
            .unwrap();
        PrintOptions::for_page(&page, 0, 1, 100.0, 500.0)
    }

    struct TwoUnits(LayerOptions);

    impl DecorationLayer for TwoUnits {
        fn options(&self) -> &LayerOptions {
            &self.0
        }

        fn tiles(&self, _options: &PrintOptions) -> Result<Vec<SyntheticTile>, LayerError> {
            Ok(vec![
                SyntheticTile::new(false, |_| Ok(())),
                SyntheticTile::new(true, |_| Ok(())),
            ])
        }
    }

    async fn drain(iter: &mut LayerTileIterator) -> Vec<PendingTile> {
        let mut out = Vec::new();
        while let Some(tile) = iter.next().await.unwrap() {
            out.push(tile);
        }
        out
    }

    #[tokio::test]
    async fn test_layers_in_order_with_zoom_per_layer() {
        let map = StubRaster::new("M", 3).scale_dependent();
        let sat = StubRaster::new("S", 2);
        let mut iter = LayerTileIterator::new(
            vec![LayerKind::raster(map), LayerKind::raster(sat)],
            options(),
            ZoomSelection::new(14, 16),
            CancellationToken::new(),
        );

        let tiles = drain(&mut iter).await;
        let tags: Vec<_> = tiles.iter().map(|t| (t.layer.as_str(), t.zoom)).collect();
        assert_eq!(
            tags,
            vec![
                ("M", Some(14)),
                ("M", Some(14)),
                ("M", Some(14)),
                ("S", Some(16)),
                ("S", Some(16)),
            ]
        );
        assert!((tiles[0].progress_weight - 1.0 / 3.0).abs() < 1e-12);
        assert!((tiles[4].progress_weight - 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_empty_layer_yields_one_empty_token() {
        let mut iter = LayerTileIterator::new(
            vec![LayerKind::raster(StubRaster::new("E", 0))],
            options(),
            ZoomSelection::new(14, 16),
            CancellationToken::new(),
        );

        let tiles = drain(&mut iter).await;
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].progress_weight, 1.0);

        let tile = tiles.into_iter().next().unwrap();
        assert!(matches!(tile.token.settle().await, Ok(TileInfo::Empty)));
    }

    #[tokio::test]
    async fn test_decoration_units() {
        let mut iter = LayerTileIterator::new(
            vec![LayerKind::decoration(TwoUnits(LayerOptions::overlay("Deco")))],
            options(),
            ZoomSelection::new(14, 16),
            CancellationToken::new(),
        );

        let tiles = drain(&mut iter).await;
        assert_eq!(tiles.len(), 2);
        assert!(tiles.iter().all(|t| t.zoom.is_none()));
        assert!((tiles[0].progress_weight - 0.005).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_overlay_tiles_carry_draw_position() {
        let overlay = StubRaster::with_options(
            LayerOptions::overlay("T").with_transparency(true),
            1,
        );
        let mut iter = LayerTileIterator::new(
            vec![
                LayerKind::raster(StubRaster::new("M", 2)),
                LayerKind::raster(overlay),
            ],
            options(),
            ZoomSelection::new(14, 16),
            CancellationToken::new(),
        );

        let tiles = drain(&mut iter).await;
        let positions: Vec<_> = tiles.iter().map(|t| (t.layer_index, t.layer.as_str())).collect();
        assert_eq!(positions, vec![(0, "M"), (0, "M"), (1, "T")]);
        assert_eq!(tiles[2].zoom, Some(16));
    }

    #[tokio::test]
    async fn test_stop_ends_sequence() {
        let mut iter = LayerTileIterator::new(
            vec![LayerKind::raster(StubRaster::new("M", 5))],
            options(),
            ZoomSelection::new(14, 16),
            CancellationToken::new(),
        );

        assert!(iter.next().await.unwrap().is_some());
        iter.stop();
        assert!(iter.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_page_yields_nothing() {
        let page = CancellationToken::new();
        page.cancel();
        let mut iter = LayerTileIterator::new(
            vec![LayerKind::raster(StubRaster::new("M", 5))],
            options(),
            ZoomSelection::new(14, 16),
            page,
        );
        assert!(iter.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_plan_error_propagates() {
        let mut iter = LayerTileIterator::new(
            vec![LayerKind::raster(StubRaster::new("M", 1).failing_plan())],
            options(),
            ZoomSelection::new(14, 16),
            CancellationToken::new(),
        );
        let err = iter.next().await.unwrap_err();
        assert!(matches!(err, LayerError::Plan { .. }));
    }
}
