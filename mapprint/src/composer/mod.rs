//! Page compositing
//!
//! [`PageComposer`] folds a page's tiles, in generation order, into one
//! output raster. Consecutive tiles that share a bucket key are drawn onto
//! one intermediate canvas; when the key changes, that canvas is merged
//! into the target and released before the next one is allocated.
//!
//! ```text
//! tiles ──► [bucket: zoom 16]──draw─────┐
//!           [bucket: overlay]──multiply──► target (dest px) ──► JPEG
//!           [bucket: solid]────draw─────┘
//! ```
//!
//! Raster buckets live at the source zoom's resolution (derived from the
//! page bounds at the reference zoom, times the tile scale) and are
//! stretched to the destination size when merged, source-over, so the
//! alpha of a transparent layer lets the page below show through. Overlay
//! buckets are destination-sized.

mod blend;
mod encode;

pub use blend::{luminance, multiply_onto};
pub use encode::{decode_tile, encode_jpeg, pixmap_from_rgba};

use thiserror::Error;
use tiny_skia::{Color, FilterQuality, Pixmap, PixmapPaint, Transform};
use tracing::trace;

use crate::coord::{PixelBounds, REFERENCE_ZOOM};
use crate::job::PrintOptions;
use crate::layer::{LayerError, RasterTile, SyntheticTile, TileInfo};

/// Errors raised while compositing a page.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A decoration's draw callback failed
    #[error(transparent)]
    Draw(#[from] LayerError),

    #[error("Cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}

/// How a bucket's content reaches the target.
#[derive(Debug, Clone, Copy, PartialEq)]
enum BucketKey {
    /// Source-resolution raster, drawn over.
    Raster { zoom: u8, tile_scale: f64 },
    /// Destination-sized vector ink, multiply-blended.
    Overlay,
    /// Destination-sized vector content, drawn over.
    SolidOverlay,
}

struct Bucket {
    key: BucketKey,
    canvas: Pixmap,
    /// Unrounded canvas extent; the canvas itself is rounded up.
    extent: (f64, f64),
}

/// Builds one page raster from a stream of tiles.
pub struct PageComposer {
    target: Pixmap,
    reference_size: (f64, f64),
    current: Option<Bucket>,
    merged_buckets: usize,
}

impl PageComposer {
    /// Creates a composer for a `width`×`height` page showing
    /// `reference_bounds` (pixel bounds at the reference zoom).
    pub fn new(width: u32, height: u32, reference_bounds: PixelBounds) -> Result<Self, ComposeError> {
        let mut target = Pixmap::new(width, height).ok_or(ComposeError::Canvas { width, height })?;
        target.fill(Color::WHITE);

        Ok(Self {
            target,
            reference_size: (reference_bounds.width(), reference_bounds.height()),
            current: None,
            merged_buckets: 0,
        })
    }

    pub fn for_page(options: &PrintOptions) -> Result<Self, ComposeError> {
        Self::new(options.dest_width, options.dest_height, options.pixel_bounds)
    }

    pub fn width(&self) -> u32 {
        self.target.width()
    }

    pub fn height(&self) -> u32 {
        self.target.height()
    }

    /// Draws one settled tile.
    pub fn put_tile(&mut self, tile: TileInfo) -> Result<(), ComposeError> {
        match tile {
            TileInfo::Empty => Ok(()),
            TileInfo::Raster(raster) => {
                let key = BucketKey::Raster {
                    zoom: raster.zoom,
                    tile_scale: raster.tile_scale,
                };
                let bucket = self.bucket_for(key)?;
                draw_raster(&mut bucket.canvas, &raster);
                Ok(())
            }
            TileInfo::Synthetic(SyntheticTile {
                draw,
                overlay_solid,
            }) => {
                let key = if overlay_solid {
                    BucketKey::SolidOverlay
                } else {
                    BucketKey::Overlay
                };
                let bucket = self.bucket_for(key)?;
                draw(&mut bucket.canvas)?;
                Ok(())
            }
        }
    }

    /// Flushes the last bucket and returns the page raster.
    pub fn finish(mut self) -> Result<Pixmap, ComposeError> {
        self.merge_current()?;
        Ok(self.target)
    }

    /// Flushes the last bucket and encodes the page as JPEG.
    pub fn encode_jpeg(self, quality: u8) -> Result<Vec<u8>, ComposeError> {
        let page = self.finish()?;
        encode_jpeg(&page, quality).map_err(|e| ComposeError::Encode(e.to_string()))
    }

    fn bucket_for(&mut self, key: BucketKey) -> Result<&mut Bucket, ComposeError> {
        let bucket = match self.current.take() {
            Some(bucket) if bucket.key == key => bucket,
            previous => {
                self.current = previous;
                self.merge_current()?;
                self.new_bucket(key)?
            }
        };
        Ok(self.current.insert(bucket))
    }

    fn new_bucket(&self, key: BucketKey) -> Result<Bucket, ComposeError> {
        let extent = match key {
            BucketKey::Raster { zoom, tile_scale } => {
                let divisor = 2.0_f64.powi(REFERENCE_ZOOM.saturating_sub(zoom) as i32);
                (
                    self.reference_size.0 / divisor * tile_scale,
                    self.reference_size.1 / divisor * tile_scale,
                )
            }
            BucketKey::Overlay | BucketKey::SolidOverlay => {
                (self.target.width() as f64, self.target.height() as f64)
            }
        };

        let width = (extent.0.ceil() as u32).max(1);
        let height = (extent.1.ceil() as u32).max(1);
        let canvas = Pixmap::new(width, height).ok_or(ComposeError::Canvas { width, height })?;

        trace!(?key, width = width, height = height, "Bucket allocated");
        Ok(Bucket {
            key,
            canvas,
            extent,
        })
    }

    fn merge_current(&mut self) -> Result<(), ComposeError> {
        let Some(bucket) = self.current.take() else {
            return Ok(());
        };

        match bucket.key {
            BucketKey::Raster { .. } => {
                let (sx, sy) = self.stretch_factors(bucket.extent);
                self.target.draw_pixmap(
                    0,
                    0,
                    bucket.canvas.as_ref(),
                    &paint_for(sx, sy),
                    Transform::from_scale(sx as f32, sy as f32),
                    None,
                );
            }
            BucketKey::Overlay => multiply_onto(&bucket.canvas, &mut self.target),
            BucketKey::SolidOverlay => {
                self.target.draw_pixmap(
                    0,
                    0,
                    bucket.canvas.as_ref(),
                    &PixmapPaint::default(),
                    Transform::identity(),
                    None,
                );
            }
        }

        self.merged_buckets += 1;
        trace!(key = ?bucket.key, merged = self.merged_buckets, "Bucket merged");
        Ok(())
    }

    fn stretch_factors(&self, extent: (f64, f64)) -> (f64, f64) {
        (
            self.target.width() as f64 / extent.0,
            self.target.height() as f64 / extent.1,
        )
    }
}

/// Exact copies stay unfiltered; anything scaled is sampled bilinearly.
fn paint_for(sx: f64, sy: f64) -> PixmapPaint {
    let quality = if sx == 1.0 && sy == 1.0 {
        FilterQuality::Nearest
    } else {
        FilterQuality::Bilinear
    };
    PixmapPaint {
        quality,
        ..Default::default()
    }
}

fn draw_raster(canvas: &mut Pixmap, tile: &RasterTile) {
    let size = tile.tile_size * tile.tile_scale;
    let sx = size / tile.image.width() as f64;
    let sy = size / tile.image.height() as f64;
    let x = tile.tile_pos.x * tile.tile_scale;
    let y = tile.tile_pos.y * tile.tile_scale;

    let transform = Transform::from_row(sx as f32, 0.0, 0.0, sy as f32, x as f32, y as f32);
    canvas.draw_pixmap(0, 0, tile.image.as_ref(), &paint_for(sx, sy), transform, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::PixelPoint;
    use tiny_skia::{Paint, Rect};

    const ZOOM: u8 = 20;

    /// Reference bounds whose zoom-20 extent is exactly `w`×`h`.
    fn reference(w: f64, h: f64) -> PixelBounds {
        let factor = 2.0_f64.powi((REFERENCE_ZOOM - ZOOM) as i32);
        PixelBounds::new(PixelPoint::new(0.0, 0.0), PixelPoint::new(w * factor, h * factor))
    }

    fn solid_image(w: u32, h: u32, color: Color) -> Pixmap {
        let mut pixmap = Pixmap::new(w, h).unwrap();
        pixmap.fill(color);
        pixmap
    }

    fn raster(x: f64, y: f64, size: u32, color: Color) -> TileInfo {
        TileInfo::Raster(RasterTile {
            image: solid_image(size, size, color),
            tile_pos: PixelPoint::new(x, y),
            tile_size: size as f64,
            zoom: ZOOM,
            tile_scale: 1.0,
        })
    }

    fn fill_rect(overlay_solid: bool, rect: Rect, color: Color) -> TileInfo {
        TileInfo::Synthetic(SyntheticTile::new(overlay_solid, move |canvas| {
            let mut paint = Paint::default();
            paint.set_color(color);
            canvas.fill_rect(rect, &paint, Transform::identity(), None);
            Ok(())
        }))
    }

    fn rgb(pixmap: &Pixmap, x: u32, y: u32) -> (u8, u8, u8) {
        let c = pixmap.pixel(x, y).unwrap().demultiply();
        (c.red(), c.green(), c.blue())
    }

    #[test]
    fn test_blank_page_is_white() {
        let composer = PageComposer::new(8, 8, reference(8.0, 8.0)).unwrap();
        let page = composer.finish().unwrap();
        assert_eq!(rgb(&page, 4, 4), (255, 255, 255));
    }

    #[test]
    fn test_raster_tiles_fill_page() {
        let mut composer = PageComposer::new(8, 8, reference(8.0, 8.0)).unwrap();
        composer
            .put_tile(raster(0.0, 0.0, 4, Color::from_rgba8(255, 0, 0, 255)))
            .unwrap();
        composer
            .put_tile(raster(4.0, 0.0, 4, Color::from_rgba8(0, 0, 255, 255)))
            .unwrap();

        let page = composer.finish().unwrap();
        assert_eq!(rgb(&page, 1, 1), (255, 0, 0));
        assert_eq!(rgb(&page, 6, 1), (0, 0, 255));
        assert_eq!(rgb(&page, 6, 6), (255, 255, 255));
    }

    #[test]
    fn test_raster_bucket_is_stretched_to_page() {
        // 4x4 source pixels printed on a 16x16 page
        let mut composer = PageComposer::new(16, 16, reference(4.0, 4.0)).unwrap();
        composer
            .put_tile(raster(0.0, 0.0, 4, Color::from_rgba8(0, 255, 0, 255)))
            .unwrap();

        let page = composer.finish().unwrap();
        assert_eq!(rgb(&page, 8, 8), (0, 255, 0));
    }

    #[test]
    fn test_overlay_multiplies_and_solid_overwrites() {
        let mut composer = PageComposer::new(10, 10, reference(10.0, 10.0)).unwrap();
        composer
            .put_tile(raster(0.0, 0.0, 10, Color::from_rgba8(200, 200, 200, 255)))
            .unwrap();
        let left = Rect::from_xywh(0.0, 0.0, 5.0, 10.0).unwrap();
        composer
            .put_tile(fill_rect(false, left, Color::from_rgba8(0, 0, 0, 255)))
            .unwrap();
        let corner = Rect::from_xywh(8.0, 8.0, 2.0, 2.0).unwrap();
        composer
            .put_tile(fill_rect(true, corner, Color::from_rgba8(0, 255, 0, 255)))
            .unwrap();

        let page = composer.finish().unwrap();
        assert_eq!(rgb(&page, 2, 2), (0, 0, 0));
        assert_eq!(rgb(&page, 7, 2), (200, 200, 200));
        assert_eq!(rgb(&page, 9, 9), (0, 255, 0));
    }

    #[test]
    fn test_overlay_raster_draws_over_base() {
        let mut composer = PageComposer::new(4, 4, reference(4.0, 4.0)).unwrap();
        composer
            .put_tile(raster(0.0, 0.0, 4, Color::from_rgba8(0, 0, 255, 255)))
            .unwrap();
        composer
            .put_tile(raster(0.0, 0.0, 4, Color::from_rgba8(255, 0, 0, 255)))
            .unwrap();

        let page = composer.finish().unwrap();
        assert_eq!(rgb(&page, 1, 1), (255, 0, 0));
    }

    #[test]
    fn test_transparent_raster_shows_base_through() {
        let mut composer = PageComposer::new(4, 4, reference(4.0, 4.0)).unwrap();
        composer
            .put_tile(raster(0.0, 0.0, 4, Color::from_rgba8(0, 0, 255, 255)))
            .unwrap();
        // Left half clear, right half opaque red
        let mut image = Pixmap::new(4, 4).unwrap();
        let mut paint = Paint::default();
        paint.set_color(Color::from_rgba8(255, 0, 0, 255));
        image.fill_rect(
            Rect::from_xywh(2.0, 0.0, 2.0, 4.0).unwrap(),
            &paint,
            Transform::identity(),
            None,
        );
        composer
            .put_tile(TileInfo::Raster(RasterTile {
                image,
                tile_pos: PixelPoint::new(0.0, 0.0),
                tile_size: 4.0,
                zoom: ZOOM,
                tile_scale: 1.0,
            }))
            .unwrap();

        let page = composer.finish().unwrap();
        assert_eq!(rgb(&page, 0, 1), (0, 0, 255));
        assert_eq!(rgb(&page, 3, 1), (255, 0, 0));
    }

    #[test]
    fn test_bucket_changes_merge_in_order() {
        let mut composer = PageComposer::new(4, 4, reference(4.0, 4.0)).unwrap();
        let all = Rect::from_xywh(0.0, 0.0, 4.0, 4.0).unwrap();

        composer
            .put_tile(raster(0.0, 0.0, 4, Color::from_rgba8(255, 0, 0, 255)))
            .unwrap();
        composer
            .put_tile(fill_rect(true, all, Color::from_rgba8(0, 0, 255, 255)))
            .unwrap();
        // Same zoom as the first bucket, but a new bucket: drawn over the solid one
        composer
            .put_tile(raster(0.0, 0.0, 4, Color::from_rgba8(0, 255, 0, 255)))
            .unwrap();
        assert_eq!(composer.merged_buckets, 2);

        let page = composer.finish().unwrap();
        assert_eq!(rgb(&page, 2, 2), (0, 255, 0));
    }

    #[test]
    fn test_same_key_shares_bucket() {
        let mut composer = PageComposer::new(8, 8, reference(8.0, 8.0)).unwrap();
        for x in [0.0, 4.0] {
            composer
                .put_tile(raster(x, 0.0, 4, Color::from_rgba8(1, 2, 3, 255)))
                .unwrap();
        }
        composer.put_tile(TileInfo::Empty).unwrap();
        assert_eq!(composer.merged_buckets, 0);
    }

    #[test]
    fn test_draw_error_propagates() {
        let mut composer = PageComposer::new(4, 4, reference(4.0, 4.0)).unwrap();
        let failing = TileInfo::Synthetic(SyntheticTile::new(false, |_| {
            Err(LayerError::draw("Grid", "no path"))
        }));

        let err = composer.put_tile(failing).unwrap_err();
        assert_eq!(err.to_string(), "Failed to draw Grid: no path");
    }

    #[test]
    fn test_identical_streams_give_identical_jpeg() {
        let render = || {
            let mut composer = PageComposer::new(32, 24, reference(16.0, 12.0)).unwrap();
            composer
                .put_tile(raster(-3.0, 0.0, 8, Color::from_rgba8(10, 120, 200, 255)))
                .unwrap();
            composer
                .put_tile(raster(5.0, 4.0, 8, Color::from_rgba8(250, 120, 20, 255)))
                .unwrap();
            let band = Rect::from_xywh(0.0, 10.0, 32.0, 3.0).unwrap();
            composer
                .put_tile(fill_rect(false, band, Color::from_rgba8(0, 0, 0, 160)))
                .unwrap();
            composer.encode_jpeg(90).unwrap()
        };
        assert_eq!(render(), render());
    }
}
