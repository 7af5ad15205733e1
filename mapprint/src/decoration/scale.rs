//! Printed scale caption.
//!
//! The nominal scale only holds at the page's centre latitude. The caption
//! measures the ground actually covered by one printed centimetre along the
//! north and south edges and shows a range when either edge is off by more
//! than [`SCALE_TOLERANCE`].

use tiny_skia::Pixmap;

use super::text::{draw_caption_box, LabelFont};
use super::{CAPTION_FONT_MM, CAPTION_PADDING_MM};
use crate::coord::parallel_distance;
use crate::job::PrintOptions;
use crate::layer::{DecorationLayer, LayerError, LayerOptions, SyntheticTile};

/// Relative edge-scale divergence above which a range is printed.
pub const SCALE_TOLERANCE: f64 = 0.05;

/// Ground metres per printed centimetre at the north and south page edges.
pub fn edge_scales(options: &PrintOptions) -> (f64, f64) {
    let bounds = &options.geo_bounds;
    let width_cm = options.print_size.width_mm / 10.0;
    if width_cm <= 0.0 {
        return (options.scale, options.scale);
    }
    let per_cm = |lat: f64| parallel_distance(lat, bounds.west, bounds.east) / width_cm;
    (per_cm(bounds.north), per_cm(bounds.south))
}

/// `500 m` or `1.5 km`; metres are rounded to whole numbers first.
fn format_scale(meters: f64) -> (String, &'static str) {
    let rounded = meters.round();
    if rounded >= 1000.0 {
        (trim_number(rounded / 1000.0), "km")
    } else {
        (trim_number(rounded), "m")
    }
}

fn trim_number(value: f64) -> String {
    let s = format!("{:.3}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Caption text for a page.
pub fn caption(options: &PrintOptions) -> String {
    let (north, south) = edge_scales(options);
    let nominal = options.scale;
    let diverges = |value: f64| nominal > 0.0 && ((value - nominal) / nominal).abs() > SCALE_TOLERANCE;

    let mut text = if diverges(north) || diverges(south) {
        let (low, low_unit) = format_scale(north.min(south));
        let (high, high_unit) = format_scale(north.max(south));
        if low_unit == high_unit {
            format!("{}–{} {} in 1 cm", low, high, high_unit)
        } else {
            format!("{} {}–{} {} in 1 cm", low, low_unit, high, high_unit)
        }
    } else {
        let (value, unit) = format_scale(nominal);
        format!("{} {} in 1 cm", value, unit)
    };

    if options.pages_count > 1 {
        text.push_str(&format!(
            " | Page {} / {}",
            options.page_label, options.pages_count
        ));
    }
    text
}

/// Scale caption decoration. Needs a caption font.
#[derive(Debug, Clone)]
pub struct OverlayScale {
    options: LayerOptions,
    font: LabelFont,
}

impl OverlayScale {
    pub fn new(font: LabelFont) -> Self {
        Self {
            options: LayerOptions::overlay("Scale"),
            font,
        }
    }
}

impl DecorationLayer for OverlayScale {
    fn options(&self) -> &LayerOptions {
        &self.options
    }

    fn tiles(&self, options: &PrintOptions) -> Result<Vec<SyntheticTile>, LayerError> {
        let text = caption(options);
        let font = self.font.clone();
        let font_size = options.mm_to_px(CAPTION_FONT_MM) as f32;
        let padding = options.mm_to_px(CAPTION_PADDING_MM) as f32;

        Ok(vec![SyntheticTile::new(true, move |canvas: &mut Pixmap| {
            draw_caption_box(canvas, &font, &text, 0.0, 0.0, font_size, padding)
                .map(|_| ())
                .ok_or_else(|| LayerError::draw("Scale", "caption box is empty"))
        })])
    }
}
