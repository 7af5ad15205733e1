//! Zooms command - show suggested source zooms for a scale and resolution.

use mapprint::coord::{MAX_LAT, MIN_LAT};
use mapprint::job::ZoomSelection;

use crate::error::CliError;

/// Arguments for the zooms command.
pub struct ZoomsArgs {
    pub scale: f64,
    pub resolution: f64,
    pub lat: f64,
}

/// Run the zooms command.
pub fn run(args: ZoomsArgs) -> Result<(), CliError> {
    if !args.scale.is_finite() || args.scale <= 0.0 {
        return Err(CliError::InvalidArgument(format!(
            "scale must be positive, got {}",
            args.scale
        )));
    }
    if !args.resolution.is_finite() || args.resolution <= 0.0 {
        return Err(CliError::InvalidArgument(format!(
            "resolution must be positive, got {}",
            args.resolution
        )));
    }
    if !(MIN_LAT..=MAX_LAT).contains(&args.lat) {
        return Err(CliError::InvalidArgument(format!(
            "latitude must be between {} and {}, got {}",
            MIN_LAT, MAX_LAT, args.lat
        )));
    }

    let zooms = ZoomSelection::suggest(args.scale, args.resolution, args.lat.abs());

    println!(
        "Scale {} m in 1 cm at {} dpi, latitude {}:",
        args.scale, args.resolution, args.lat
    );
    println!("  Map zoom:       {}", zooms.map_zoom);
    println!("  Satellite zoom: {}", zooms.sat_zoom);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_scale() {
        let result = run(ZoomsArgs {
            scale: 0.0,
            resolution: 300.0,
            lat: 0.0,
        });
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn test_rejects_polar_latitude() {
        let result = run(ZoomsArgs {
            scale: 500.0,
            resolution: 300.0,
            lat: 89.0,
        });
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn test_prints_suggestion() {
        let result = run(ZoomsArgs {
            scale: 500.0,
            resolution: 300.0,
            lat: 55.7,
        });
        assert!(result.is_ok());
    }
}
