//! Job file settings structs.

use std::path::PathBuf;

use crate::coord::LatLng;
use crate::job::{Margins, Orientation, PaperSize};

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One PDF with a page per map page.
    Pdf,
    /// One JPEG file per map page.
    Jpeg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(format!("unknown format '{}'", other)),
        }
    }
}

/// `[job]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSettings {
    pub format: OutputFormat,
    pub resolution: f64,
    pub scale: f64,
    pub paper_width_mm: f64,
    pub paper_height_mm: f64,
    pub margins: Margins,
    /// Suggested from scale and resolution when absent.
    pub map_zoom: Option<u8>,
    pub sat_zoom: Option<u8>,
    pub max_active: usize,
    pub jpeg_quality: u8,
}

impl JobSettings {
    pub fn paper(&self) -> PaperSize {
        PaperSize {
            width_mm: self.paper_width_mm,
            height_mm: self.paper_height_mm,
            margins: self.margins,
        }
    }
}

/// A `[page.<label>]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSettings {
    pub label: String,
    pub center: LatLng,
    pub orientation: Orientation,
}

/// A `[layer.<name>]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSettings {
    pub name: String,
    pub url: String,
    pub subdomains: Vec<String>,
    pub short_name: String,
    /// Draw-order key, compared lexicographically; equal keys keep file order.
    pub order: Vec<i32>,
    pub print: bool,
    pub overlay: bool,
    pub transparent: bool,
    pub scale_dependent: bool,
    pub tile_size: u32,
    pub max_zoom: u8,
    pub weight: f64,
}

/// `[decorations]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationSettings {
    pub grid: bool,
    pub scale: bool,
    pub magnetic_meridians: bool,
    /// Degrees east, used everywhere on the page.
    pub declination: f64,
    /// Caption font; captions are skipped without one.
    pub font: Option<PathBuf>,
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    /// HTTP timeout in seconds.
    pub timeout: u64,
}

/// A parsed job file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobFile {
    pub job: JobSettings,
    pub pages: Vec<PageSettings>,
    pub layers: Vec<LayerSettings>,
    pub decorations: DecorationSettings,
    pub download: DownloadSettings,
}
