//! Magnetic declination lookup.

use crate::coord::LatLng;

/// Magnetic declination in degrees east of true north.
///
/// `None` means the model has no value at that position; meridian lines
/// stop there.
pub trait DeclinationModel: Send + Sync {
    fn declination(&self, point: LatLng) -> Option<f64>;
}

/// The same declination everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantDeclination(pub f64);

impl DeclinationModel for ConstantDeclination {
    fn declination(&self, _point: LatLng) -> Option<f64> {
        Some(self.0)
    }
}

impl<F> DeclinationModel for F
where
    F: Fn(LatLng) -> Option<f64> + Send + Sync,
{
    fn declination(&self, point: LatLng) -> Option<f64> {
        self(point)
    }
}
