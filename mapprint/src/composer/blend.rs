//! Multiply blending of overlay ink onto the page.

use tiny_skia::{ColorU8, Pixmap};

/// Relative luminance of an 8-bit RGB colour, in `0.0..=1.0` (Rec. 601).
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0
}

/// Blends `src` onto `dest` in place.
///
/// Per pixel and channel, with `a` the source alpha and `L` the luminance
/// of the destination pixel:
///
/// ```text
/// dest' = src * L * a + dest * (1 - a)
/// ```
///
/// Fully transparent source pixels leave the destination untouched; white
/// ink at full alpha keeps the destination's luminance. Destination alpha
/// is preserved. Both canvases must have the same size.
pub fn multiply_onto(src: &Pixmap, dest: &mut Pixmap) {
    debug_assert_eq!(
        (src.width(), src.height()),
        (dest.width(), dest.height()),
        "multiply blend needs equal canvas sizes"
    );

    for (d, s) in dest.pixels_mut().iter_mut().zip(src.pixels()) {
        if s.alpha() == 0 {
            continue;
        }
        let s = s.demultiply();
        let base = d.demultiply();

        let a = s.alpha() as f32 / 255.0;
        let l = luminance(base.red(), base.green(), base.blue());
        let mix = |src_c: u8, dest_c: u8| -> u8 {
            (src_c as f32 * l * a + dest_c as f32 * (1.0 - a))
                .round()
                .clamp(0.0, 255.0) as u8
        };

        *d = ColorU8::from_rgba(
            mix(s.red(), base.red()),
            mix(s.green(), base.green()),
            mix(s.blue(), base.blue()),
            base.alpha(),
        )
        .premultiply();
    }
}
