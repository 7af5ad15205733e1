//! Source zoom selection for a print job.

use crate::coord::{EARTH_CIRCUMFERENCE, MAX_ZOOM, MIN_ZOOM, TILE_SIZE};

use super::page::Page;

/// Screen resolution map tiles are designed for.
const SCREEN_DPI: f64 = 90.0;

/// Map tiles keep legible labels when printed this much smaller.
const MAP_SHRINK_FACTOR: f64 = 1.5;

const CM_PER_INCH: f64 = 2.54;

/// Zoom levels used when fetching tiles for a job.
///
/// Scale-dependent layers (street maps, where labels and symbols change
/// with zoom) use `map_zoom`; everything else (imagery) uses `sat_zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomSelection {
    pub map_zoom: u8,
    pub sat_zoom: u8,
}

impl ZoomSelection {
    pub fn new(map_zoom: u8, sat_zoom: u8) -> Self {
        Self { map_zoom, sat_zoom }
    }

    /// Suggests zooms that put roughly one source pixel under each printed
    /// pixel for `scale` metres per centimetre at `dpi`.
    ///
    /// `reference_lat` corrects for Mercator stretching; use
    /// [`reference_latitude`] to pick it for a set of pages.
    pub fn suggest(scale: f64, dpi: f64, reference_lat: f64) -> Self {
        let lat_factor = reference_lat.to_radians().cos();

        let sat_mpp = scale / (dpi / CM_PER_INCH);
        let sat_zoom = zoom_for_meters_per_pixel(sat_mpp / lat_factor).ceil();

        let map_mpp = scale / (SCREEN_DPI / CM_PER_INCH) / MAP_SHRINK_FACTOR;
        let map_zoom = zoom_for_meters_per_pixel(map_mpp / lat_factor).round();

        Self {
            map_zoom: clamp_zoom(map_zoom),
            sat_zoom: clamp_zoom(sat_zoom),
        }
    }

    /// Zoom to request for a layer.
    #[inline]
    pub fn for_layer(&self, scale_dependent: bool) -> u8 {
        if scale_dependent {
            self.map_zoom
        } else {
            self.sat_zoom
        }
    }
}

/// Latitude nearest the equator among the pages' south edges.
///
/// Returns 0 for an empty page list.
pub fn reference_latitude(pages: &[Page]) -> f64 {
    pages
        .iter()
        .map(|page| page.geo_bounds.south.abs())
        .fold(None, |min: Option<f64>, lat| {
            Some(min.map_or(lat, |m| m.min(lat)))
        })
        .unwrap_or(0.0)
}

fn zoom_for_meters_per_pixel(mpp: f64) -> f64 {
    (EARTH_CIRCUMFERENCE / TILE_SIZE as f64 / mpp).log2()
}

fn clamp_zoom(zoom: f64) -> u8 {
    if zoom.is_nan() {
        return MIN_ZOOM;
    }
    zoom.clamp(MIN_ZOOM as f64, MAX_ZOOM as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::LatLngBounds;
    use crate::job::PrintSize;

    #[test]
    fn test_suggest_at_equator() {
        // 500 m/cm at 300 dpi: 4.23 m per printed pixel
        //   sat: log2(156543.03 / 4.233) = 15.17 -> 16
        //   map: log2(156543.03 / 9.407) = 14.02 -> 14
        let zooms = ZoomSelection::suggest(500.0, 300.0, 0.0);
        assert_eq!(zooms.sat_zoom, 16);
        assert_eq!(zooms.map_zoom, 14);
    }

    #[test]
    fn test_suggest_higher_latitude_uses_lower_zoom() {
        // Mercator tiles at 60° already carry twice the ground detail
        let equator = ZoomSelection::suggest(500.0, 300.0, 0.0);
        let north = ZoomSelection::suggest(500.0, 300.0, 60.0);
        assert_eq!(north.sat_zoom, equator.sat_zoom - 1);
        assert_eq!(north.map_zoom, equator.map_zoom - 1);
    }

    #[test]
    fn test_suggest_clamps_to_zoom_range() {
        let tiny = ZoomSelection::suggest(0.001, 600.0, 0.0);
        assert_eq!(tiny.sat_zoom, MAX_ZOOM);
        assert_eq!(tiny.map_zoom, MAX_ZOOM);

        let huge = ZoomSelection::suggest(1e9, 72.0, 0.0);
        assert_eq!(huge.sat_zoom, MIN_ZOOM);
        assert_eq!(huge.map_zoom, MIN_ZOOM);
    }

    #[test]
    fn test_for_layer() {
        let zooms = ZoomSelection::new(14, 16);
        assert_eq!(zooms.for_layer(true), 14);
        assert_eq!(zooms.for_layer(false), 16);
    }

    #[test]
    fn test_reference_latitude() {
        let size = PrintSize::new(100.0, 100.0);
        let pages = vec![
            Page::new(LatLngBounds::new(55.0, 37.0, 56.0, 38.0), size, "1"),
            Page::new(LatLngBounds::new(-40.0, 37.0, -39.0, 38.0), size, "2"),
        ];
        assert_eq!(reference_latitude(&pages), 40.0);
        assert_eq!(reference_latitude(&[]), 0.0);
    }
}
