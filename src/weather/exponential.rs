use super::{AtmosphericModel, DelayKind, Result};
use crate::geodesy::ecef_to_geodetic;
use nalgebra::Vector3;

/// Horizontally uniform atmosphere with refractivities decaying exponentially with height
///
/// N(z) = N0 exp(-z/H) for each delay component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialAtmosphere {
    /// Surface hydrostatic refractivity [N-units]
    pub hydrostatic_surface: f64,
    /// Hydrostatic scale height [m]
    pub hydrostatic_scale: f64,
    /// Surface wet refractivity [N-units]
    pub wet_surface: f64,
    /// Wet scale height [m]
    pub wet_scale: f64,
}
impl Default for ExponentialAtmosphere {
    fn default() -> Self {
        Self {
            hydrostatic_surface: 272.9,
            hydrostatic_scale: 8_400.,
            wet_surface: 60.,
            wet_scale: 2_000.,
        }
    }
}
impl ExponentialAtmosphere {
    pub fn new(
        hydrostatic_surface: f64,
        hydrostatic_scale: f64,
        wet_surface: f64,
        wet_scale: f64,
    ) -> Self {
        Self {
            hydrostatic_surface,
            hydrostatic_scale,
            wet_surface,
            wet_scale,
        }
    }
    fn parameters(&self, kind: DelayKind) -> (f64, f64) {
        match kind {
            DelayKind::Hydrostatic => (self.hydrostatic_surface, self.hydrostatic_scale),
            DelayKind::Wet => (self.wet_surface, self.wet_scale),
        }
    }
    /// Refractivity at the given height [m]
    pub fn refractivity(&self, kind: DelayKind, height: f64) -> f64 {
        let (n0, scale) = self.parameters(kind);
        n0 * (-height / scale).exp()
    }
    /// Exact zenith delay [m] between two heights [m]
    pub fn zenith_delay(&self, kind: DelayKind, bottom: f64, top: f64) -> f64 {
        let (n0, scale) = self.parameters(kind);
        1e-6 * n0 * scale * ((-bottom / scale).exp() - (-top / scale).exp())
    }
    fn query(&self, kind: DelayKind, positions: &[Vector3<f64>]) -> Vec<f64> {
        positions
            .iter()
            .map(|xyz| self.refractivity(kind, ecef_to_geodetic(xyz).height))
            .collect()
    }
}
impl AtmosphericModel for ExponentialAtmosphere {
    fn hydrostatic_delay(&self, positions: &[Vector3<f64>]) -> Result<Vec<f64>> {
        Ok(self.query(DelayKind::Hydrostatic, positions))
    }
    fn wet_delay(&self, positions: &[Vector3<f64>]) -> Result<Vec<f64>> {
        Ok(self.query(DelayKind::Wet, positions))
    }
}
