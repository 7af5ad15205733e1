//! Metric coordinate grid.

use tiny_skia::{Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::text::{draw_caption_box, LabelFont};
use super::{CAPTION_FONT_MM, CAPTION_PADDING_MM};
use crate::coord::{CanvasProjection, LatLng, PixelPoint, MAX_LAT, METERS_PER_DEGREE, MIN_LAT};
use crate::job::PrintOptions;
use crate::layer::{DecorationLayer, LayerError, LayerOptions, SyntheticTile};

/// Round ground distances the grid spacing is picked from, in metres.
pub const GRID_INTERVALS: [f64; 42] = [
    1.0, 1.5, 2.0, 3.3, 5.0, 7.5,
    10.0, 15.0, 20.0, 33.0, 50.0, 75.0,
    100.0, 150.0, 200.0, 333.0, 500.0, 750.0,
    1000.0, 1500.0, 2000.0, 3333.0, 5000.0, 7500.0,
    10000.0, 15000.0, 20000.0, 33333.0, 50000.0, 75000.0,
    100000.0, 150000.0, 200000.0, 333333.0, 500000.0, 750000.0,
    1000000.0, 1500000.0, 2000000.0, 3333333.0, 5000000.0, 7500000.0,
];

/// Grid cells are never printed smaller than this.
pub const MIN_GRID_INTERVAL_MM: f64 = 15.0;

pub const GRID_LINE_MM: f64 = 0.2;

/// Upper bound on rows or columns, against degenerate projections.
const MAX_LINES_PER_AXIS: usize = 10_000;

/// Opaque RGB shades of the two strokes of a grid line.
const DARK_SHADE: (u8, u8, u8) = (0x99, 0x99, 0x99);
const LIGHT_SHADE: (u8, u8, u8) = (0xcc, 0xcc, 0xcc);

/// Grid spacing on the ground and on paper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridInterval {
    pub meters: f64,
    pub millimeters: f64,
}

/// Smallest ladder distance printed at least [`MIN_GRID_INTERVAL_MM`]
/// apart at `scale` metres per centimetre.
pub fn grid_interval(scale: f64) -> GridInterval {
    let min_meters = MIN_GRID_INTERVAL_MM / 10.0 * scale;
    let meters = GRID_INTERVALS
        .iter()
        .copied()
        .find(|&interval| interval >= min_meters)
        .unwrap_or(GRID_INTERVALS[GRID_INTERVALS.len() - 1]);

    GridInterval {
        meters,
        millimeters: meters / scale * 10.0,
    }
}

/// `750 m`, `1.5 km`, `10 km`.
pub fn format_distance(meters: f64) -> String {
    let (value, unit) = if meters < 1000.0 {
        (meters, "m")
    } else {
        (meters / 1000.0, "km")
    };
    if value.fract() == 0.0 {
        format!("{} {}", value, unit)
    } else {
        format!("{:.1} {}", value, unit)
    }
}

/// A straight piece of a grid line, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: PixelPoint,
    pub to: PixelPoint,
}

impl Segment {
    /// Unit normal: down for rows, right for columns.
    fn normal(&self) -> (f64, f64) {
        if self.from.y == self.to.y {
            (0.0, 1.0)
        } else {
            (1.0, 0.0)
        }
    }
}

/// Grid lines for a page.
///
/// Rows follow parallels spaced `interval` apart on the ground, counted
/// from the page centre. Between two rows the columns are spaced by the
/// ground interval at that band's latitude, stepping out from the page
/// centre, so columns are drawn band by band.
pub fn grid_segments(options: &PrintOptions, interval_m: f64) -> Vec<Segment> {
    let projection = options.canvas_projection();
    let width = options.dest_width as f64;
    let height = options.dest_height as f64;
    let center = projection.to_lat_lng(PixelPoint::new(width / 2.0, height / 2.0));

    let rows = row_positions(&projection, center, interval_m, height);
    let mut segments = Vec::new();

    for &y in rows.iter().filter(|&&y| (0.0..=height).contains(&y)) {
        segments.push(Segment {
            from: PixelPoint::new(0.0, y),
            to: PixelPoint::new(width, y),
        });
    }

    for band in rows.windows(2) {
        let top = band[0].max(0.0);
        let bottom = band[1].min(height);
        if bottom <= top {
            continue;
        }
        let band_lat = projection
            .to_lat_lng(PixelPoint::new(width / 2.0, (top + bottom) / 2.0))
            .lat;
        let step = interval_m * projection.pixels_per_meter(band_lat);
        if !step.is_finite() || step <= 0.0 {
            continue;
        }

        for x in column_positions(width, step) {
            segments.push(Segment {
                from: PixelPoint::new(x, top),
                to: PixelPoint::new(x, bottom),
            });
        }
    }
    segments
}

/// Canvas y of every row, north to south, with one row past each page edge.
fn row_positions(
    projection: &CanvasProjection,
    center: LatLng,
    interval_m: f64,
    height: f64,
) -> Vec<f64> {
    let step_deg = interval_m / METERS_PER_DEGREE;
    let row_y = |k: i64| {
        let lat = (center.lat + k as f64 * step_deg).clamp(MIN_LAT, MAX_LAT);
        projection.to_canvas(LatLng::new(lat, center.lng)).y
    };

    let mut rows = vec![row_y(0)];
    for k in 1..MAX_LINES_PER_AXIS as i64 {
        let y = row_y(k);
        if y >= rows[rows.len() - 1] {
            break;
        }
        rows.push(y);
        if y < 0.0 {
            break;
        }
    }
    rows.reverse();
    for k in 1..MAX_LINES_PER_AXIS as i64 {
        let y = row_y(-k);
        if y <= rows[rows.len() - 1] {
            break;
        }
        rows.push(y);
        if y > height {
            break;
        }
    }
    rows
}

/// Column x positions stepping out from the page centre.
fn column_positions(width: f64, step: f64) -> Vec<f64> {
    let center = width / 2.0;
    let mut xs = vec![center];
    for n in 1..MAX_LINES_PER_AXIS {
        let offset = n as f64 * step;
        if offset > center {
            break;
        }
        xs.push(center - offset);
        xs.push(center + offset);
    }
    xs
}

/// Coordinate grid decoration.
#[derive(Debug, Clone)]
pub struct Grid {
    options: LayerOptions,
    font: Option<LabelFont>,
}

impl Grid {
    pub fn new() -> Self {
        Self {
            options: LayerOptions::overlay("Grid"),
            font: None,
        }
    }

    /// Enables the `Grid 750 m` caption.
    pub fn with_font(mut self, font: LabelFont) -> Self {
        self.font = Some(font);
        self
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl DecorationLayer for Grid {
    fn options(&self) -> &LayerOptions {
        &self.options
    }

    fn tiles(&self, options: &PrintOptions) -> Result<Vec<SyntheticTile>, LayerError> {
        let interval = grid_interval(options.scale);
        let segments = grid_segments(options, interval.meters);
        let line_width = options.mm_to_px(GRID_LINE_MM) as f32;

        let mut tiles = vec![SyntheticTile::new(false, move |canvas| {
            draw_lines(canvas, &segments, line_width);
            Ok(())
        })];

        if let Some(font) = self.font.clone() {
            let caption = format!("Grid {}", format_distance(interval.meters));
            let font_size = options.mm_to_px(CAPTION_FONT_MM) as f32;
            let padding = options.mm_to_px(CAPTION_PADDING_MM) as f32;
            tiles.push(SyntheticTile::new(true, move |canvas| {
                let (ascent, descent) = font.vertical_metrics(font_size);
                let box_height = ascent - descent + 2.0 * padding;
                let top = canvas.height() as f32 - box_height;
                draw_caption_box(canvas, &font, &caption, 0.0, top, font_size, padding)
                    .map(|_| ())
                    .ok_or_else(|| LayerError::draw("Grid", "caption box is empty"))
            }));
        }
        Ok(tiles)
    }
}

/// Strokes every segment twice, half a line width to either side of it,
/// dark above or left and light below or right.
fn draw_lines(canvas: &mut Pixmap, segments: &[Segment], line_width: f32) {
    let stroke = Stroke {
        width: line_width,
        ..Default::default()
    };
    let half = line_width as f64 / 2.0;

    for ((r, g, b), offset) in [(DARK_SHADE, -half), (LIGHT_SHADE, half)] {
        let mut builder = PathBuilder::new();
        for segment in segments {
            let (nx, ny) = segment.normal();
            let (dx, dy) = (nx * offset, ny * offset);
            builder.move_to((segment.from.x + dx) as f32, (segment.from.y + dy) as f32);
            builder.line_to((segment.to.x + dx) as f32, (segment.to.y + dy) as f32);
        }
        let Some(path) = builder.finish() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, 0xff);
        canvas.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Page, PrintSize};

    fn options(center: LatLng, scale: f64) -> PrintOptions {
        let page = Page::from_center(center, PrintSize::new(196.0, 283.0), scale, "1").unwrap();
        PrintOptions::for_page(&page, 0, 1, 300.0, scale)
    }

    fn horizontal_ys(segments: &[Segment], width: f64) -> Vec<f64> {
        segments
            .iter()
            .filter(|s| s.from.y == s.to.y && s.from.x == 0.0 && s.to.x == width)
            .map(|s| s.from.y)
            .collect()
    }

    #[test]
    fn test_interval_at_500_is_15mm() {
        let interval = grid_interval(500.0);
        assert_eq!(interval.meters, 750.0);
        assert!((interval.millimeters - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_interval_ladder() {
        assert_eq!(grid_interval(10.0).meters, 15.0);
        assert_eq!(grid_interval(1000.0).meters, 1500.0);
        assert_eq!(grid_interval(2000.0).meters, 3333.0);
        assert_eq!(grid_interval(1e9).meters, 7_500_000.0);
        assert!(grid_interval(2000.0).millimeters >= MIN_GRID_INTERVAL_MM);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(750.0), "750 m");
        assert_eq!(format_distance(1.5), "1.5 m");
        assert_eq!(format_distance(1500.0), "1.5 km");
        assert_eq!(format_distance(3333.0), "3.3 km");
        assert_eq!(format_distance(10000.0), "10 km");
    }

    #[test]
    fn test_rows_are_15mm_apart_and_centered() {
        let options = options(LatLng::new(0.5, 10.0), 500.0);
        let width = options.dest_width as f64;
        let segments = grid_segments(&options, 750.0);
        let ys = horizontal_ys(&segments, width);
        let expected = options.mm_to_px(15.0);

        assert!(ys.len() >= 18);
        let center_y = options.dest_height as f64 / 2.0;
        assert!(ys.iter().any(|y| (y - center_y).abs() < 1e-6));
        for pair in ys.windows(2) {
            let gap = pair[1] - pair[0];
            assert!((gap - expected).abs() < 1.0, "row gap {} vs {}", gap, expected);
        }
    }

    #[test]
    fn test_columns_step_from_center() {
        let options = options(LatLng::new(0.5, 10.0), 500.0);
        let segments = grid_segments(&options, 750.0);
        let center_x = options.dest_width as f64 / 2.0;
        let expected = options.mm_to_px(15.0);

        // middle of the band just below the centre row
        let probe = options.dest_height as f64 / 2.0 + expected / 2.0;
        let mut xs: Vec<f64> = segments
            .iter()
            .filter(|s| s.from.x == s.to.x && s.from.y <= probe && s.to.y >= probe)
            .map(|s| s.from.x)
            .collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());

        assert!(xs.iter().any(|x| (x - center_x).abs() < 1e-9));
        for pair in xs.windows(2) {
            assert!((pair[1] - pair[0] - expected).abs() < 1.0);
        }
    }

    #[test]
    fn test_columns_widen_towards_the_pole() {
        let options = options(LatLng::new(60.0, 30.0), 50_000.0);
        let interval = grid_interval(50_000.0).meters;
        let segments = grid_segments(&options, interval);
        let height = options.dest_height as f64;

        let spacing_in_band = |y: f64| {
            let mut xs: Vec<f64> = segments
                .iter()
                .filter(|s| s.from.x == s.to.x && s.from.y <= y && s.to.y >= y)
                .map(|s| s.from.x)
                .collect();
            xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
            xs[1] - xs[0]
        };

        assert!(spacing_in_band(1.0) > spacing_in_band(height - 1.0));
    }

    #[test]
    fn test_layer_units() {
        let grid = Grid::new();
        let options = options(LatLng::new(45.0, 5.0), 500.0);
        let tiles = grid.tiles(&options).unwrap();

        assert_eq!(tiles.len(), 1);
        assert!(!tiles[0].overlay_solid);
        assert_eq!(grid.options().short_name, "Grid");
    }

    #[test]
    fn test_lines_ink_the_canvas() {
        let grid = Grid::new();
        let options = options(LatLng::new(45.0, 5.0), 500.0);
        let mut canvas = Pixmap::new(options.dest_width, options.dest_height).unwrap();

        for tile in grid.tiles(&options).unwrap() {
            (tile.draw)(&mut canvas).unwrap();
        }
        let center = canvas
            .pixel(options.dest_width / 2, options.dest_height / 2)
            .unwrap();
        assert!(center.alpha() > 0, "grid crosses the page centre");
    }

    #[test]
    fn test_line_shades_sit_either_side_of_the_line() {
        let mut canvas = Pixmap::new(24, 24).unwrap();
        let segments = [
            Segment {
                from: PixelPoint::new(0.0, 10.0),
                to: PixelPoint::new(20.0, 10.0),
            },
            Segment {
                from: PixelPoint::new(16.0, 0.0),
                to: PixelPoint::new(16.0, 20.0),
            },
        ];
        draw_lines(&mut canvas, &segments, 2.0);

        // Grey level of an inked pixel, `None` where nothing was drawn
        let shade = |x: u32, y: u32| {
            let c = canvas.pixel(x, y).unwrap();
            (c.alpha() > 128).then(|| c.demultiply().red())
        };
        let is_shade = |x: u32, y: u32, want: u8| shade(x, y).is_some_and(|v| v.abs_diff(want) <= 2);

        // Row: dark band above, light band below, along its full length
        assert!(is_shade(0, 9, 0x99));
        assert!(is_shade(0, 10, 0xcc));
        assert!(is_shade(12, 9, 0x99));
        assert!(is_shade(12, 10, 0xcc));
        assert_eq!(shade(4, 7), None);
        assert_eq!(shade(4, 12), None);
        // Column: dark band left, light band right, down to its end
        assert!(is_shade(15, 19, 0x99));
        assert!(is_shade(16, 19, 0xcc));
        assert_eq!(shade(13, 3), None);
        assert_eq!(shade(18, 3), None);
    }

    #[test]
    fn test_caption_unit_with_font() {
        let grid = Grid::new().with_font(crate::decoration::text::tests::fixture_font());
        let options = options(LatLng::new(45.0, 5.0), 500.0);
        let tiles = grid.tiles(&options).unwrap();

        assert_eq!(tiles.len(), 2);
        assert!(tiles[1].overlay_solid);
    }
}
