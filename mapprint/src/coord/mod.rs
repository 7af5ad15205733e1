//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator pixel space, plus the page-canvas projection used by
//! decorations to go from canvas pixels back to the ground.

mod types;

pub use types::{
    CoordError, LatLng, LatLngBounds, PixelBounds, PixelPoint, TileCoord, EARTH_CIRCUMFERENCE,
    EARTH_RADIUS, MAX_LAT, MAX_LON, MAX_ZOOM, METERS_PER_DEGREE, MIN_LAT, MIN_LON, MIN_ZOOM,
    REFERENCE_ZOOM, TILE_SIZE,
};

use std::f64::consts::PI;

/// Size of the whole world in pixels at the given zoom.
#[inline]
pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE as f64 * 2.0_f64.powi(zoom as i32)
}

/// Validates a geographic position against the Web Mercator range.
pub fn validate_lat_lng(point: LatLng) -> Result<LatLng, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&point.lat) {
        return Err(CoordError::InvalidLatitude(point.lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&point.lng) {
        return Err(CoordError::InvalidLongitude(point.lng));
    }
    Ok(point)
}

/// Validates a source zoom level.
pub fn validate_zoom(zoom: u8) -> Result<u8, CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    Ok(zoom)
}

/// Projects a geographic position to pixel space at `zoom`.
///
/// Latitude is clamped to the Mercator range so that page edges near the
/// poles still project to finite pixels.
#[inline]
pub fn project(point: LatLng, zoom: u8) -> PixelPoint {
    let size = world_size(zoom);
    let lat = point.lat.clamp(MIN_LAT, MAX_LAT);

    let x = (point.lng + 180.0) / 360.0 * size;
    let lat_rad = lat * PI / 180.0;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * size;

    PixelPoint::new(x, y)
}

/// Converts a pixel position at `zoom` back to latitude/longitude.
#[inline]
pub fn unproject(point: PixelPoint, zoom: u8) -> LatLng {
    let size = world_size(zoom);

    let lng = point.x / size * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * point.y / size)).sinh().atan();

    LatLng::new(lat_rad * 180.0 / PI, lng)
}

/// Projects geographic bounds to pixel bounds at `zoom`.
pub fn pixel_bounds(bounds: &LatLngBounds, zoom: u8) -> PixelBounds {
    PixelBounds::new(
        project(bounds.north_west(), zoom),
        project(bounds.south_east(), zoom),
    )
}

/// Ground length of the arc along parallel `lat` between two longitudes.
pub fn parallel_distance(lat: f64, lng1: f64, lng2: f64) -> f64 {
    let delta = (lng2 - lng1).abs().to_radians();
    EARTH_RADIUS * lat.to_radians().cos() * delta
}

/// Maps page-canvas pixels to the ground and back.
///
/// The canvas covers the page's pixel bounds at [`REFERENCE_ZOOM`],
/// stretched to the destination pixel size.
#[derive(Debug, Clone, Copy)]
pub struct CanvasProjection {
    origin: PixelPoint,
    scale_x: f64,
    scale_y: f64,
}

impl CanvasProjection {
    /// Creates a projection for a canvas of `width`×`height` pixels showing
    /// `bounds` (reference-zoom pixel bounds).
    pub fn new(bounds: PixelBounds, width: u32, height: u32) -> Self {
        Self {
            origin: bounds.min,
            scale_x: bounds.width() / width.max(1) as f64,
            scale_y: bounds.height() / height.max(1) as f64,
        }
    }

    pub fn to_lat_lng(&self, canvas: PixelPoint) -> LatLng {
        unproject(
            PixelPoint::new(
                self.origin.x + canvas.x * self.scale_x,
                self.origin.y + canvas.y * self.scale_y,
            ),
            REFERENCE_ZOOM,
        )
    }

    pub fn to_canvas(&self, point: LatLng) -> PixelPoint {
        let projected = project(point, REFERENCE_ZOOM);
        PixelPoint::new(
            (projected.x - self.origin.x) / self.scale_x,
            (projected.y - self.origin.y) / self.scale_y,
        )
    }

    /// Horizontal canvas pixels covering one metre of ground at `lat`.
    pub fn pixels_per_meter(&self, lat: f64) -> f64 {
        let equator_px_per_meter = world_size(REFERENCE_ZOOM) / (2.0 * PI * EARTH_RADIUS);
        equator_px_per_meter / lat.to_radians().cos() / self.scale_x
    }
}
