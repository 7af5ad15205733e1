//! Caption text rendering
//!
//! Captions are short single-line labels. Glyphs are laid out unshaped
//! (one glyph per char, horizontal advances only) and their outlines are
//! filled onto the page canvas.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tiny_skia::{Color, FillRule, Paint, Path as SkPath, PathBuilder, Pixmap, Rect, Transform};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

/// Errors loading a caption font.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("Cannot read font {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid font data: {0}")]
    Parse(String),
}

/// A TrueType/OpenType font used for captions.
#[derive(Clone)]
pub struct LabelFont {
    data: Arc<Vec<u8>>,
}

impl LabelFont {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FontError> {
        Face::parse(&data, 0).map_err(|e| FontError::Parse(e.to_string()))?;
        Ok(Self {
            data: Arc::new(data),
        })
    }

    pub fn load(path: &Path) -> Result<Self, FontError> {
        let data = fs::read(path).map_err(|source| FontError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(data)
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }

    /// Advance width of `text` at `font_size` pixels.
    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        let Some(face) = self.face() else {
            return 0.0;
        };
        layout(&face, text, font_size, 0.0, 0.0).1
    }

    /// Ascent and descent (descent negative) at `font_size` pixels.
    pub fn vertical_metrics(&self, font_size: f32) -> (f32, f32) {
        let Some(face) = self.face() else {
            return (font_size, 0.0);
        };
        let scale = font_size / face.units_per_em().max(1) as f32;
        (
            face.ascender() as f32 * scale,
            face.descender() as f32 * scale,
        )
    }

    /// Fills `text` with its baseline starting at (`x`, `baseline_y`).
    ///
    /// Returns the number of glyph outlines drawn.
    pub fn fill_text(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        x: f32,
        baseline_y: f32,
        font_size: f32,
        color: Color,
    ) -> usize {
        let Some(face) = self.face() else {
            return 0;
        };
        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = true;

        let (placements, _) = layout(&face, text, font_size, x, baseline_y);
        let mut drawn = 0;
        for placement in placements {
            let mut builder = GlyphPathBuilder::new(placement.origin_x, placement.origin_y, placement.scale);
            if face.outline_glyph(placement.glyph, &mut builder).is_none() {
                continue;
            }
            let Some(path) = builder.finish() else {
                continue;
            };
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            drawn += 1;
        }
        drawn
    }
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFont")
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Draws `text` in a white box whose top-left corner is (`x`, `y`).
///
/// Returns the box as drawn.
pub fn draw_caption_box(
    pixmap: &mut Pixmap,
    font: &LabelFont,
    text: &str,
    x: f32,
    y: f32,
    font_size: f32,
    padding: f32,
) -> Option<Rect> {
    let (ascent, descent) = font.vertical_metrics(font_size);
    let width = font.measure(text, font_size) + 2.0 * padding;
    let height = ascent - descent + 2.0 * padding;
    let rect = Rect::from_xywh(x, y, width, height)?;

    let mut paint = Paint::default();
    paint.set_color(Color::WHITE);
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);

    font.fill_text(
        pixmap,
        text,
        x + padding,
        y + padding + ascent,
        font_size,
        Color::BLACK,
    );
    Some(rect)
}

struct GlyphPlacement {
    glyph: GlyphId,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

/// Unshaped layout; missing glyphs advance half an em.
fn layout(
    face: &Face<'_>,
    text: &str,
    font_size: f32,
    baseline_x: f32,
    baseline_y: f32,
) -> (Vec<GlyphPlacement>, f32) {
    let units_per_em = face.units_per_em().max(1) as f32;
    let scale = font_size / units_per_em;

    let mut out = Vec::new();
    let mut pen_x = 0.0f32;
    for ch in text.chars() {
        let Some(glyph) = face.glyph_index(ch) else {
            pen_x += font_size * 0.5;
            continue;
        };
        out.push(GlyphPlacement {
            glyph,
            origin_x: baseline_x + pen_x,
            origin_y: baseline_y,
            scale,
        });
        let advance = face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
        pen_x += if advance > 0.0 { advance } else { font_size * 0.5 };
    }
    (out, pen_x)
}

/// Maps font units (y up) onto canvas pixels (y down).
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<SkPath> {
        self.builder.finish()
    }

    #[inline]
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
