//! Lines of sight
//!
//! [LineOfSight] is what callers hand over together with a grid of points,
//! [LookVectors] is its flattened per-point form consumed by the ray builder.

use crate::geodesy::{enu_to_ecef, local_up, Geodetic};
use nalgebra::Vector3;
use ndarray::{ArrayD, ArrayViewD, Axis};
use std::ops::Range;

/// Per-point look vectors
#[derive(Debug, Clone, Copy)]
pub enum LookVectors<'a> {
    /// Straight up to the troposphere reference height
    Zenith,
    /// ECEF vectors [m] from the ground point toward the sensor
    Explicit(&'a [Vector3<f64>]),
    /// Incidence angles [deg] for the vertical path + secant projection approximation
    Projection(&'a [f64]),
}
impl<'a> LookVectors<'a> {
    /// Look vectors of the points within `range`
    pub fn slice(&self, range: Range<usize>) -> LookVectors<'a> {
        match *self {
            LookVectors::Zenith => LookVectors::Zenith,
            LookVectors::Explicit(v) => LookVectors::Explicit(&v[range]),
            LookVectors::Projection(v) => LookVectors::Projection(&v[range]),
        }
    }
    /// Number of look vectors, `None` for zenith
    pub fn len(&self) -> Option<usize> {
        match self {
            LookVectors::Zenith => None,
            LookVectors::Explicit(v) => Some(v.len()),
            LookVectors::Projection(v) => Some(v.len()),
        }
    }
    pub fn is_zenith(&self) -> bool {
        matches!(self, LookVectors::Zenith)
    }
}

/// Owned counterpart of [LookVectors]
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedLos {
    Zenith,
    Explicit(Vec<Vector3<f64>>),
    Projection(Vec<f64>),
}
impl ResolvedLos {
    pub fn as_look_vectors(&self) -> LookVectors<'_> {
        match self {
            ResolvedLos::Zenith => LookVectors::Zenith,
            ResolvedLos::Explicit(v) => LookVectors::Explicit(v),
            ResolvedLos::Projection(v) => LookVectors::Projection(v),
        }
    }
}

/// Line of sight for a grid of points
#[derive(Debug, Clone, PartialEq)]
pub enum LineOfSight {
    Zenith,
    /// ECEF look vectors, with the grid shape plus a trailing axis of size 3
    Vectors(ArrayD<f64>),
    /// Incidence and heading angles [deg], each with the grid shape
    Angles {
        incidence: ArrayD<f64>,
        heading: ArrayD<f64>,
    },
}
impl LineOfSight {
    /// Splits a 2 bands (incidence, heading) array along its first axis
    pub fn from_bands(bands: ArrayD<f64>) -> Option<Self> {
        if bands.ndim() < 1 || bands.shape()[0] != 2 {
            return None;
        }
        Some(LineOfSight::Angles {
            incidence: bands.index_axis(Axis(0), 0).to_owned(),
            heading: bands.index_axis(Axis(0), 1).to_owned(),
        })
    }
    /// The shape of the grid this line of sight applies to, `None` for zenith
    ///
    /// Look vectors without a trailing axis of size 3 report their full shape.
    pub fn grid_shape(&self) -> Option<Vec<usize>> {
        match self {
            LineOfSight::Zenith => None,
            LineOfSight::Vectors(v) => {
                let shape = v.shape();
                if shape.last() == Some(&3) {
                    Some(shape[..shape.len() - 1].to_vec())
                } else {
                    Some(shape.to_vec())
                }
            }
            LineOfSight::Angles { incidence, .. } => Some(incidence.shape().to_vec()),
        }
    }
    pub fn is_zenith(&self) -> bool {
        matches!(self, LineOfSight::Zenith)
    }
    /// Checks that the incidence and heading bands agree
    pub fn is_consistent(&self) -> bool {
        match self {
            LineOfSight::Angles { incidence, heading } => incidence.shape() == heading.shape(),
            _ => true,
        }
    }
    /// Flattens the line of sight for the given points
    ///
    /// In raytrace mode incidence and heading angles are turned into look vectors
    /// reaching `zref`; in projection mode look vectors are turned into incidence angles.
    /// The shapes must have been validated beforehand.
    pub fn resolve(&self, points: &[Geodetic], zref: f64, raytrace: bool) -> ResolvedLos {
        match (self, raytrace) {
            (LineOfSight::Zenith, _) => ResolvedLos::Zenith,
            (LineOfSight::Vectors(v), true) => ResolvedLos::Explicit(flat_vectors(v.view())),
            (LineOfSight::Vectors(v), false) => ResolvedLos::Projection(
                flat_vectors(v.view())
                    .iter()
                    .zip(points)
                    .map(|(lv, p)| incidence_angle(lv, p))
                    .collect(),
            ),
            (LineOfSight::Angles { incidence, heading }, true) => ResolvedLos::Explicit(
                incidence
                    .iter()
                    .zip(heading.iter())
                    .zip(points)
                    .map(|((&i, &h), p)| look_vector(i, h, p, zref))
                    .collect(),
            ),
            (LineOfSight::Angles { incidence, .. }, false) => {
                ResolvedLos::Projection(incidence.iter().cloned().collect())
            }
        }
    }
}

fn flat_vectors(v: ArrayViewD<f64>) -> Vec<Vector3<f64>> {
    v.iter()
        .cloned()
        .collect::<Vec<f64>>()
        .chunks_exact(3)
        .map(Vector3::from_column_slice)
        .collect()
}

/// Look vector [m] in ECEF from incidence and heading angles [deg]
///
/// The vector is scaled to reach the reference height `zref` [m].
pub fn look_vector(incidence: f64, heading: f64, point: &Geodetic, zref: f64) -> Vector3<f64> {
    let (si, ci) = incidence.to_radians().sin_cos();
    let (sh, ch) = (heading + 90.).to_radians().sin_cos();
    let range = (zref - point.height) / ci;
    let enu = Vector3::new(si * ch, si * sh, ci) * range;
    enu_to_ecef(&enu, point.lat, point.lon)
}

/// Angle [deg] between a look vector and the local vertical
pub fn incidence_angle(look_vector: &Vector3<f64>, point: &Geodetic) -> f64 {
    let up = local_up(point.lat, point.lon);
    let cos = look_vector.dot(&up) / look_vector.norm();
    cos.clamp(-1., 1.).acos().to_degrees()
}
