//! Magnetic meridians.
//!
//! Lines following magnetic north, spaced [`LINE_INTERVAL_MM`] apart on
//! paper. Each line is traced from a start point in steps of
//! [`SAMPLING_INTERVAL_MM`], re-reading the declination at every step, so
//! lines bend where the field does.
//!
//! ```text
//!        ^     ^     ^     ^     ^
//!        |     |     |     |     |
//!   <----+-----+-----C-----+-----+---->   start points, stepped
//!        |     |     |     |     |        perpendicular to magnetic north
//!        v     v     v     v     v
//! ```

use std::sync::Arc;

use tiny_skia::{Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::declination::DeclinationModel;
use crate::coord::{CanvasProjection, PixelPoint};
use crate::job::PrintOptions;
use crate::layer::{DecorationLayer, LayerError, LayerOptions, SyntheticTile};

pub const LINE_WIDTH_MM: f64 = 0.2;
pub const LINE_INTERVAL_MM: f64 = 50.0;
pub const SAMPLING_INTERVAL_MM: f64 = 15.0;

const LINE_RGB: (u8, u8, u8) = (0x66, 0xc2, 0xff);

/// Moves `point` by `distance` pixels at `angle` degrees clockwise from
/// canvas up.
fn move_point(point: PixelPoint, angle: f64, distance: f64) -> PixelPoint {
    let angle = angle.to_radians();
    PixelPoint::new(
        point.x + angle.sin() * distance,
        point.y - angle.cos() * distance,
    )
}

struct Tracer<'a> {
    projection: CanvasProjection,
    model: &'a dyn DeclinationModel,
    sampling_px: f64,
    max_segments: usize,
}

impl Tracer<'_> {
    fn declination(&self, point: PixelPoint) -> Option<f64> {
        self.model
            .declination(self.projection.to_lat_lng(point))
            .filter(|d| d.is_finite())
    }

    /// Follows magnetic north (or south) from `start`.
    fn trace(&self, start: PixelPoint, southward: bool) -> Vec<PixelPoint> {
        let mut line = vec![start];
        let mut point = start;
        for _ in 0..=self.max_segments {
            let Some(mut angle) = self.declination(point) else {
                break;
            };
            if southward {
                angle += 180.0;
            }
            point = move_point(point, angle, self.sampling_px);
            line.push(point);
        }
        line
    }
}

/// Polylines of the meridian family for a page, in canvas pixels.
///
/// The first two lines run north and south from the page centre. Start
/// points for the others are stepped sideways from the centre, first east
/// then west; a missing declination there counts as zero.
pub fn meridian_polylines(
    options: &PrintOptions,
    model: &dyn DeclinationModel,
) -> Vec<Vec<PixelPoint>> {
    let width = options.dest_width as f64;
    let height = options.dest_height as f64;
    let half_diagonal = width.hypot(height) / 2.0;
    let sampling_px = options.mm_to_px(SAMPLING_INTERVAL_MM);
    let interval_px = options.mm_to_px(LINE_INTERVAL_MM);
    if sampling_px <= 0.0 || interval_px <= 0.0 {
        return Vec::new();
    }

    let tracer = Tracer {
        projection: options.canvas_projection(),
        model,
        sampling_px,
        max_segments: (half_diagonal / sampling_px) as usize,
    };
    let max_lines = (half_diagonal / interval_px) as usize;
    let center = PixelPoint::new(width / 2.0, height / 2.0);

    let mut lines = vec![tracer.trace(center, false), tracer.trace(center, true)];
    for side in [90.0, -90.0] {
        let mut start = center;
        for _ in 0..=max_lines {
            let declination = tracer.declination(start).unwrap_or(0.0);
            start = move_point(start, declination + side, interval_px);
            lines.push(tracer.trace(start, false));
            lines.push(tracer.trace(start, true));
        }
    }
    lines
}

/// Magnetic meridian decoration.
#[derive(Clone)]
pub struct MagneticMeridians {
    options: LayerOptions,
    model: Arc<dyn DeclinationModel>,
}

impl MagneticMeridians {
    pub fn new(model: Arc<dyn DeclinationModel>) -> Self {
        Self {
            options: LayerOptions::overlay("Magnetic"),
            model,
        }
    }
}

impl std::fmt::Debug for MagneticMeridians {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagneticMeridians")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DecorationLayer for MagneticMeridians {
    fn options(&self) -> &LayerOptions {
        &self.options
    }

    fn tiles(&self, options: &PrintOptions) -> Result<Vec<SyntheticTile>, LayerError> {
        let lines = meridian_polylines(options, self.model.as_ref());
        let line_width = options.mm_to_px(LINE_WIDTH_MM) as f32;
        tracing::trace!(
            page = options.page_index,
            lines = lines.len(),
            "Traced magnetic meridians"
        );

        Ok(vec![SyntheticTile::new(false, move |canvas: &mut Pixmap| {
            stroke_polylines(canvas, &lines, line_width);
            Ok(())
        })])
    }
}

/// Strokes all polylines as one path.
fn stroke_polylines(canvas: &mut Pixmap, lines: &[Vec<PixelPoint>], line_width: f32) {
    let mut builder = PathBuilder::new();
    for line in lines.iter().filter(|line| line.len() > 1) {
        builder.move_to(line[0].x as f32, line[0].y as f32);
        for point in &line[1..] {
            builder.line_to(point.x as f32, point.y as f32);
        }
    }
    let Some(path) = builder.finish() else {
        return;
    };

    let (r, g, b) = LINE_RGB;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, 0xff);
    paint.anti_alias = true;
    let stroke = Stroke {
        width: line_width,
        ..Default::default()
    };
    canvas.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}
