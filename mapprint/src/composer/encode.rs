//! Raster conversions between `image` buffers and page canvases.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbaImage};
use tiny_skia::{ColorU8, Pixmap};

/// Decodes a downloaded tile (PNG, JPEG) into a canvas.
pub fn decode_tile(bytes: &[u8]) -> Result<Pixmap, String> {
    let img = image::load_from_memory(bytes).map_err(|e| format!("image decode error: {}", e))?;
    let rgba = img.to_rgba8();
    pixmap_from_rgba(&rgba)
        .ok_or_else(|| format!("image has no pixels ({}x{})", rgba.width(), rgba.height()))
}

/// Copies straight-alpha RGBA pixels into a premultiplied canvas.
pub fn pixmap_from_rgba(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Encodes a canvas as baseline RGB JPEG. Alpha is dropped.
pub fn encode_jpeg(pixmap: &Pixmap, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut rgb = Vec::with_capacity(pixmap.width() as usize * pixmap.height() as usize * 3);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgb.extend_from_slice(&[c.red(), c.green(), c.blue()]);
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode(
        &rgb,
        pixmap.width(),
        pixmap.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}
