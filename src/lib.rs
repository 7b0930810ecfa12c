//! Tropospheric delay ray tracing
//!
//! Computes the hydrostatic and wet tropospheric delays [m] of ground points
//! by integrating the refractivity of an atmospheric model along rays running
//! from the points up to the top of the troposphere, either straight up or
//! toward a sensor.
//!
//! ```no_run
//! use tropo_raytrace::{delay_over_area, DelayConfig, ExponentialAtmosphere, LineOfSight, Span};
//!
//! let (hydro, wet) = delay_over_area(
//!     &ExponentialAtmosphere::default(),
//!     Span::new(34., 35., 0.1),
//!     Span::new(-119., -118., 0.1),
//!     Span::value(0.),
//!     &LineOfSight::Zenith,
//!     &DelayConfig::default(),
//! )?;
//! # Ok::<(), tropo_raytrace::Error>(())
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod geodesy;
pub mod grid;
pub mod los;
pub mod raster;
pub mod ray;
pub mod sampler;
pub mod station;
pub mod weather;

pub use config::{DelayConfig, STEP, ZREF};
pub use error::{Error, Result};
pub use geodesy::Geodetic;
pub use grid::{delay_at_height_levels, delay_from_grid, delay_over_area, validate_shapes, Span};
pub use los::{LineOfSight, LookVectors};
pub use raster::{delay_from_files, NpyRaster, RasterReader};
pub use weather::{
    AtmosphericModel, ConstantAtmosphere, DelayKind, ExponentialAtmosphere, ProfileAtmosphere,
};

/// Parses a delay component tag: `hydro` or `wet`
pub fn parse_component(tag: &str) -> Result<DelayKind> {
    tag.parse::<DelayKind>()
        .map_err(|_| Error::UnknownJobType(tag.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components() {
        assert_eq!(parse_component("hydro").unwrap(), DelayKind::Hydrostatic);
        assert_eq!(parse_component("wet").unwrap(), DelayKind::Wet);
        assert!(matches!(
            parse_component("dry"),
            Err(Error::UnknownJobType(tag)) if tag == "dry"
        ));
    }
}
