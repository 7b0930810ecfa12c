//! Atmospheric models
//!
//! A model maps ECEF positions to hydrostatic and wet refractivities (N-units).
//! The delay engine only ever reads from a model, possibly from several threads at once.

use nalgebra::Vector3;
use strum_macros::{Display, EnumIter, EnumString};

mod exponential;
mod profile;
pub use exponential::ExponentialAtmosphere;
pub use profile::{ProfileAtmosphere, ProfileError};

#[derive(thiserror::Error, Debug)]
#[error("atmospheric model query failed: {0}")]
pub struct ModelError(pub String);
impl ModelError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self(message.into())
    }
}
pub type Result<T> = std::result::Result<T, ModelError>;

/// Tropospheric delay component
#[derive(Debug, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelayKind {
    #[strum(serialize = "hydro")]
    Hydrostatic,
    #[strum(serialize = "wet")]
    Wet,
}

pub trait AtmosphericModel: Sync {
    /// Hydrostatic refractivity at each ECEF position
    fn hydrostatic_delay(&self, positions: &[Vector3<f64>]) -> Result<Vec<f64>>;
    /// Wet refractivity at each ECEF position
    fn wet_delay(&self, positions: &[Vector3<f64>]) -> Result<Vec<f64>>;
    fn delay(&self, kind: DelayKind, positions: &[Vector3<f64>]) -> Result<Vec<f64>> {
        match kind {
            DelayKind::Hydrostatic => self.hydrostatic_delay(positions),
            DelayKind::Wet => self.wet_delay(positions),
        }
    }
}
impl<M: AtmosphericModel + ?Sized> AtmosphericModel for &M {
    fn hydrostatic_delay(&self, positions: &[Vector3<f64>]) -> Result<Vec<f64>> {
        (**self).hydrostatic_delay(positions)
    }
    fn wet_delay(&self, positions: &[Vector3<f64>]) -> Result<Vec<f64>> {
        (**self).wet_delay(positions)
    }
}

/// Atmosphere with the same refractivities everywhere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantAtmosphere {
    pub hydrostatic: f64,
    pub wet: f64,
}
impl ConstantAtmosphere {
    pub fn new(hydrostatic: f64, wet: f64) -> Self {
        Self { hydrostatic, wet }
    }
}
impl AtmosphericModel for ConstantAtmosphere {
    fn hydrostatic_delay(&self, positions: &[Vector3<f64>]) -> Result<Vec<f64>> {
        Ok(vec![self.hydrostatic; positions.len()])
    }
    fn wet_delay(&self, positions: &[Vector3<f64>]) -> Result<Vec<f64>> {
        Ok(vec![self.wet; positions.len()])
    }
}
