//! Printable pages and paper geometry.

use crate::coord::{validate_lat_lng, CoordError, LatLng, LatLngBounds, METERS_PER_DEGREE};

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Converts a printed length to output pixels at `dpi`.
#[inline]
pub fn mm_to_pixels(mm: f64, dpi: f64) -> u32 {
    (mm * dpi / MM_PER_INCH).round().max(1.0) as u32
}

/// Printed size of a page's map area in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PrintSize {
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
        }
    }

    /// Swaps width and height.
    pub fn rotated(&self) -> Self {
        Self::new(self.height_mm, self.width_mm)
    }

    /// Output raster size in pixels at `dpi`.
    pub fn pixel_size(&self, dpi: f64) -> (u32, u32) {
        (
            mm_to_pixels(self.width_mm, dpi),
            mm_to_pixels(self.height_mm, dpi),
        )
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margins {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Margins {
    pub fn uniform(mm: f64) -> Self {
        Self {
            left: mm,
            top: mm,
            right: mm,
            bottom: mm,
        }
    }
}

/// Page orientation on paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Sheet of paper with margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperSize {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margins: Margins,
}

impl PaperSize {
    /// A4 with the given uniform margin.
    pub fn a4(margin_mm: f64) -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margins: Margins::uniform(margin_mm),
        }
    }

    /// The map area left inside the margins.
    ///
    /// Margins stay attached to the paper edges they were given for, so a
    /// landscape page swaps the printable size after subtracting them.
    pub fn printable(&self, orientation: Orientation) -> PrintSize {
        let size = PrintSize::new(
            self.width_mm - self.margins.left - self.margins.right,
            self.height_mm - self.margins.top - self.margins.bottom,
        );
        match orientation {
            Orientation::Portrait => size,
            Orientation::Landscape => size.rotated(),
        }
    }
}

/// One printed page: an immutable geographic window plus its printed size.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub geo_bounds: LatLngBounds,
    pub print_size: PrintSize,
    pub label: String,
}

impl Page {
    pub fn new(geo_bounds: LatLngBounds, print_size: PrintSize, label: impl Into<String>) -> Self {
        Self {
            geo_bounds,
            print_size,
            label: label.into(),
        }
    }

    /// Builds a page centred on `center` covering `print_size` at `scale`
    /// metres per printed centimetre.
    pub fn from_center(
        center: LatLng,
        print_size: PrintSize,
        scale: f64,
        label: impl Into<String>,
    ) -> Result<Self, CoordError> {
        let center = validate_lat_lng(center)?;
        let width_deg = print_size.width_mm * scale / 10.0
            / METERS_PER_DEGREE
            / center.lat.to_radians().cos();
        let height_deg = print_size.height_mm * scale / 10.0 / METERS_PER_DEGREE;

        let bounds = LatLngBounds::new(
            center.lat - height_deg / 2.0,
            center.lng - width_deg / 2.0,
            center.lat + height_deg / 2.0,
            center.lng + width_deg / 2.0,
        );
        Ok(Self::new(bounds, print_size, label))
    }

    /// Output raster size in pixels at `dpi`.
    pub fn pixel_size(&self, dpi: f64) -> (u32, u32) {
        self.print_size.pixel_size(dpi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_printable_area() {
        let paper = PaperSize::a4(7.0);
        let size = paper.printable(Orientation::Portrait);
        assert_eq!(size, PrintSize::new(196.0, 283.0));

        let landscape = paper.printable(Orientation::Landscape);
        assert_eq!(landscape, PrintSize::new(283.0, 196.0));
    }

    #[test]
    fn test_pixel_size_at_300_dpi() {
        let size = PrintSize::new(196.0, 283.0);
        assert_eq!(size.pixel_size(300.0), (2315, 3343));
    }

    #[test]
    fn test_from_center_is_centered() {
        let center = LatLng::new(55.75, 37.61);
        let page = Page::from_center(center, PrintSize::new(196.0, 283.0), 500.0, "1").unwrap();
        let c = page.geo_bounds.center();

        assert!((c.lat - center.lat).abs() < 1e-12);
        assert!((c.lng - center.lng).abs() < 1e-12);
        assert_eq!(page.label, "1");
    }

    #[test]
    fn test_from_center_height_matches_scale() {
        // 283 mm at 500 m/cm is 14150 m of ground
        let page = Page::from_center(
            LatLng::new(0.0, 0.0),
            PrintSize::new(196.0, 283.0),
            500.0,
            "1",
        )
        .unwrap();
        let height_m = (page.geo_bounds.north - page.geo_bounds.south) * METERS_PER_DEGREE;
        assert!((height_m - 14_150.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_center_rejects_invalid_center() {
        let result = Page::from_center(LatLng::new(89.5, 0.0), PrintSize::new(1.0, 1.0), 1.0, "x");
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }
}
