//! Ray construction
//!
//! Resolves each point look vector into a ray starting at the point ECEF position.

use crate::{
    geodesy::{local_up, Geodetic},
    los::LookVectors,
};
use nalgebra::Vector3;

/// A straight path from a ground point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// ECEF start position [m]
    pub start: Vector3<f64>,
    /// Unit direction
    pub direction: Vector3<f64>,
    /// Path length [m]
    pub length: f64,
}
impl Ray {
    /// Creates a ray from a start position and a look vector which norm is the ray length
    pub fn new(start: Vector3<f64>, look_vector: Vector3<f64>) -> Self {
        let length = look_vector.norm();
        Self {
            start,
            direction: look_vector / length,
            length,
        }
    }
    /// ECEF position at `t` meters from the start
    pub fn at(&self, t: f64) -> Vector3<f64> {
        self.start + self.direction * t
    }
}

/// Rays of a batch of points
#[derive(Debug, Clone, Default)]
pub struct RayBundle {
    pub rays: Vec<Ray>,
    /// Secant of the incidence angle applied to the vertical delays in projection mode
    pub correction: Option<Vec<f64>>,
}
impl RayBundle {
    pub fn len(&self) -> usize {
        self.rays.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rays.is_empty()
    }
}

/// Builds the rays of `points` for the given look vectors
///
/// In projection mode the incidence angles only give the correction factors
/// and the rays are the zenith ones.
/// Ray lengths are not validated: a point above `zref` gets a non-positive zenith length.
pub fn build_rays(points: &[Geodetic], look_vectors: LookVectors, zref: f64) -> RayBundle {
    let (look_vectors, correction) = match look_vectors {
        LookVectors::Projection(incidence) => (
            LookVectors::Zenith,
            Some(
                incidence
                    .iter()
                    .map(|i| 1. / i.to_radians().cos())
                    .collect(),
            ),
        ),
        look_vectors => (look_vectors, None),
    };
    let rays = match look_vectors {
        LookVectors::Explicit(vectors) => points
            .iter()
            .zip(vectors)
            .map(|(p, lv)| Ray::new(p.to_ecef(), *lv))
            .collect(),
        _ => points
            .iter()
            .map(|p| Ray {
                start: p.to_ecef(),
                direction: local_up(p.lat, p.lon),
                length: zref - p.height,
            })
            .collect(),
    };
    RayBundle { rays, correction }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::ecef_to_geodetic;

    #[test]
    fn zenith_rays_end_at_zref() {
        let points = vec![Geodetic::new(34., -118., 300.), Geodetic::new(-5., 20., 0.)];
        let bundle = build_rays(&points, LookVectors::Zenith, 15_000.);
        assert!(bundle.correction.is_none());
        assert_eq!(bundle.rays[0].length, 14_700.);
        for ray in &bundle.rays {
            let end = ecef_to_geodetic(&ray.at(ray.length));
            assert!((end.height - 15_000.).abs() < 1e-3);
            assert!((ray.direction.norm() - 1.).abs() < 1e-12);
        }
    }

    #[test]
    fn explicit_rays() {
        let points = vec![Geodetic::new(0., 0., 0.)];
        let lv = vec![Vector3::new(3_000., 0., 4_000.)];
        let bundle = build_rays(&points, LookVectors::Explicit(&lv), 15_000.);
        let ray = bundle.rays[0];
        assert_eq!(ray.length, 5_000.);
        assert!((ray.direction - Vector3::new(0.6, 0., 0.8)).norm() < 1e-15);
        assert!(bundle.correction.is_none());
    }

    #[test]
    fn projection_rays_are_vertical() {
        let points = vec![Geodetic::new(0., 0., 0.), Geodetic::new(0., 0., 0.)];
        let incidence = [0., 60.];
        let bundle = build_rays(&points, LookVectors::Projection(&incidence), 15_000.);
        let correction = bundle.correction.unwrap();
        assert!((correction[0] - 1.).abs() < 1e-15);
        assert!((correction[1] - 2.).abs() < 1e-12);
        assert_eq!(bundle.rays[0], bundle.rays[1]);
        assert_eq!(bundle.rays[1].length, 15_000.);
    }

    #[test]
    fn above_ceiling() {
        let points = vec![Geodetic::new(0., 0., 16_000.)];
        let bundle = build_rays(&points, LookVectors::Zenith, 15_000.);
        assert!(bundle.rays[0].length < 0.);
    }
}
