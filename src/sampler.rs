//! Path sampling and quadrature
//!
//! Each ray is sampled every `step` meters at most, the samples above the
//! troposphere reference height are dropped, the atmospheric model is queried
//! once for all the samples of all the rays and the refractivities are
//! integrated along each ray with the trapezoidal rule.

use crate::{
    geodesy::ecef_to_geodetic,
    ray::{Ray, RayBundle},
    weather::{AtmosphericModel, DelayKind, ModelError},
};
use nalgebra::Vector3;

/// Refractivity (N-units) to delay [m] conversion factor
pub const REFRACTIVITY_SCALE: f64 = 1e-6;
/// Height margin [m] above the reference height within which a sample is still kept
///
/// The ECEF to geodetic conversion of the last sample of a zenith ray lands within a
/// few nanometers of `zref`, on either side.
pub const CEILING_TOLERANCE: f64 = 1e-3;

/// Samples of a ray
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaySamples {
    /// Path parameters [m], increasing from 0
    pub t: Vec<f64>,
    /// ECEF positions [m]
    pub positions: Vec<Vector3<f64>>,
}
impl RaySamples {
    pub fn len(&self) -> usize {
        self.t.len()
    }
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

/// Number of samples along a ray of the given length
///
/// NaN or non-positive lengths give no sample.
pub fn step_count(length: f64, step: f64) -> usize {
    (length / step).ceil() as usize
}

/// `n` evenly spaced values from 0 to `length`, both ends included
pub fn linspace(length: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![0.],
        _ => {
            let delta = length / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { length } else { i as f64 * delta })
                .collect()
        }
    }
}

/// Candidate samples of a ray, before truncation
pub fn sample_ray(ray: &Ray, step: f64) -> RaySamples {
    let t = linspace(ray.length, step_count(ray.length, step));
    let positions = t.iter().map(|&t| ray.at(t)).collect();
    RaySamples { t, positions }
}

/// Index of the first position higher than `zref`, or the number of positions if none is
///
/// A position counts as higher only if it is more than [CEILING_TOLERANCE] above `zref`,
/// so a sample landing on the ceiling up to round-off is kept instead of being dropped
/// by a strict `height > zref` comparison.
pub fn first_above(positions: &[Vector3<f64>], zref: f64) -> usize {
    positions
        .iter()
        .position(|xyz| ecef_to_geodetic(xyz).height > zref + CEILING_TOLERANCE)
        .unwrap_or(positions.len())
}

/// Keeps the samples below the first one higher than `zref`
pub fn truncate_at_ceiling(mut samples: RaySamples, zref: f64) -> RaySamples {
    let n = first_above(&samples.positions, zref);
    samples.t.truncate(n);
    samples.positions.truncate(n);
    samples
}

/// Trapezoidal integral of `y` over `x`, 0 with less than 2 samples
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(x, y)| 0.5 * (x[1] - x[0]) * (y[0] + y[1]))
        .sum()
}

/// Delays [m] of one component along the rays of a bundle
///
/// The model is queried once with the samples of all the rays.
pub fn integrate<M: AtmosphericModel + ?Sized>(
    model: &M,
    kind: DelayKind,
    bundle: &RayBundle,
    step: f64,
    zref: f64,
) -> Result<Vec<f64>, ModelError> {
    let samples: Vec<RaySamples> = bundle
        .rays
        .iter()
        .map(|ray| truncate_at_ceiling(sample_ray(ray, step), zref))
        .collect();
    let positions: Vec<Vector3<f64>> = samples
        .iter()
        .flat_map(|s| s.positions.iter().cloned())
        .collect();
    log::debug!(
        "{} delay: {} rays, {} samples",
        kind,
        samples.len(),
        positions.len()
    );
    let refractivity = model.delay(kind, &positions)?;
    if refractivity.len() != positions.len() {
        return Err(ModelError::new(format!(
            "{} refractivities returned for {} positions",
            refractivity.len(),
            positions.len()
        )));
    }
    let mut offset = 0;
    let mut delays: Vec<f64> = samples
        .iter()
        .map(|s| {
            let chunk = &refractivity[offset..offset + s.len()];
            offset += s.len();
            REFRACTIVITY_SCALE * trapezoid(chunk, &s.t)
        })
        .collect();
    if let Some(correction) = &bundle.correction {
        delays
            .iter_mut()
            .zip(correction)
            .for_each(|(d, c)| *d *= c);
    }
    Ok(delays)
}
