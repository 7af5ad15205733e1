//! Coordinate type definitions

use std::fmt;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom range accepted for tile sources.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 18;

/// High fixed zoom used for page pixel bounds.
///
/// All page geometry is carried at this zoom so that every source zoom can
/// be derived by an exact power-of-two division.
pub const REFERENCE_ZOOM: u8 = 24;

/// Edge length of a standard slippy-map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Spherical Mercator earth radius in metres.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Equatorial circumference used by the zoom suggestion formulas.
pub const EARTH_CIRCUMFERENCE: f64 = 40_075_016.4;

/// Length of one degree of latitude in metres.
pub const METERS_PER_DEGREE: f64 = 111_319.49;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Geographic rectangle, edges in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl LatLngBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    #[inline]
    pub fn north_west(&self) -> LatLng {
        LatLng::new(self.north, self.west)
    }

    #[inline]
    pub fn south_east(&self) -> LatLng {
        LatLng::new(self.south, self.east)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }
}

/// A point in projected pixel space (or on a page canvas).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in projected pixel space. `min` is the north-west
/// corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBounds {
    pub min: PixelPoint,
    pub max: PixelPoint,
}

impl PixelBounds {
    pub fn new(min: PixelPoint, max: PixelPoint) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Divides every coordinate by `divisor`.
    ///
    /// Used to move bounds from the reference zoom down to a source zoom.
    pub fn scaled_down(&self, divisor: f64) -> Self {
        Self {
            min: PixelPoint::new(self.min.x / divisor, self.min.y / divisor),
            max: PixelPoint::new(self.max.x / divisor, self.max.y / divisor),
        }
    }
}

/// Slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Y coordinate (north-south), 0 at north
    pub row: u32,
    /// X coordinate (east-west), 0 at west
    pub col: u32,
    /// Zoom level
    pub zoom: u8,
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside valid range (-85.05112878 to 85.05112878)
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180.0 to 180.0)
    InvalidLongitude(f64),
    /// Zoom level is outside valid range (0 to 18)
    InvalidZoom(u8),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
        }
    }
}

impl std::error::Error for CoordError {}
