//! Default values for job file settings.

use super::settings::*;
use crate::job::{Margins, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_ACTIVE};
use crate::layer::http::DEFAULT_TIMEOUT_SECS;

/// Print resolution in dots per inch.
pub const DEFAULT_RESOLUTION: f64 = 300.0;

/// Metres on the ground per printed centimetre.
pub const DEFAULT_SCALE: f64 = 500.0;

/// A4.
pub const DEFAULT_PAPER_WIDTH_MM: f64 = 210.0;
pub const DEFAULT_PAPER_HEIGHT_MM: f64 = 297.0;

pub const DEFAULT_MARGIN_MM: f64 = 7.0;

pub const DEFAULT_MAX_ACTIVE_TILES: usize = DEFAULT_MAX_ACTIVE;

pub const DEFAULT_QUALITY: u8 = DEFAULT_JPEG_QUALITY;

pub const DEFAULT_TILE_SIZE: u32 = 256;

pub const DEFAULT_LAYER_MAX_ZOOM: u8 = 18;

pub const DEFAULT_LAYER_WEIGHT: f64 = 1.0;

/// Magnetic declination in degrees east when none is configured.
pub const DEFAULT_DECLINATION: f64 = 0.0;

pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = DEFAULT_TIMEOUT_SECS;

/// Highest accepted print resolution.
pub const MAX_RESOLUTION: f64 = 1200.0;

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pdf,
            resolution: DEFAULT_RESOLUTION,
            scale: DEFAULT_SCALE,
            paper_width_mm: DEFAULT_PAPER_WIDTH_MM,
            paper_height_mm: DEFAULT_PAPER_HEIGHT_MM,
            margins: Margins::uniform(DEFAULT_MARGIN_MM),
            map_zoom: None,
            sat_zoom: None,
            max_active: DEFAULT_MAX_ACTIVE_TILES,
            jpeg_quality: DEFAULT_QUALITY,
        }
    }
}

impl Default for DecorationSettings {
    fn default() -> Self {
        Self {
            grid: false,
            scale: false,
            magnetic_meridians: false,
            declination: DEFAULT_DECLINATION,
            font: None,
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

impl LayerSettings {
    /// A printable base layer over `url` with default options.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            short_name: name.clone(),
            name,
            url: url.into(),
            subdomains: Vec::new(),
            order: Vec::new(),
            print: true,
            overlay: false,
            transparent: false,
            scale_dependent: false,
            tile_size: DEFAULT_TILE_SIZE,
            max_zoom: DEFAULT_LAYER_MAX_ZOOM,
            weight: DEFAULT_LAYER_WEIGHT,
        }
    }
}
