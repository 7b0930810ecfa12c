//! Batch orchestration
//!
//! Points come in any caller shape: a `S+[3]` array of (latitude, longitude, height),
//! the Cartesian product of three coordinate ranges or latitude/longitude rasters
//! repeated over several height levels.
//! The points are flattened, the shapes validated, the delays computed and
//! the flat delays reshaped into the caller's shape.

use crate::{
    config::DelayConfig,
    dispatch,
    geodesy::Geodetic,
    los::LineOfSight,
    weather::AtmosphericModel,
    Error, Result,
};
use indicatif::{ProgressBar, ProgressIterator};
use itertools::iproduct;
use ndarray::{concatenate, ArrayD, ArrayViewD, Axis, IxDyn};
use std::time::Instant;

/// Evenly spaced values within `[start,stop)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}
impl Span {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }
    /// A single value span
    pub fn value(value: f64) -> Self {
        Self {
            start: value,
            stop: value + 1.,
            step: 1.,
        }
    }
    pub fn len(&self) -> usize {
        let n = ((self.stop - self.start) / self.step).ceil();
        if n.is_finite() && n > 0. {
            n as usize
        } else {
            0
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn values(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

/// Checks that latitudes, longitudes, heights and line of sight share the same shape
pub fn validate_shapes(
    lats: &[usize],
    lons: &[usize],
    heights: &[usize],
    los: &LineOfSight,
) -> Result<()> {
    let los_shape = los.grid_shape();
    let los_ok = los.is_consistent() && los_shape.as_ref().map_or(true, |s| s == lats);
    if lats == lons && lats == heights && los_ok {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            lats: lats.to_vec(),
            lons: lons.to_vec(),
            heights: heights.to_vec(),
            los: los_shape,
        })
    }
}

/// Hydrostatic and wet delays of flat points, reshaped to `shape`
fn compute<M: AtmosphericModel + ?Sized>(
    model: &M,
    points: &[Geodetic],
    shape: &[usize],
    los: &LineOfSight,
    config: &DelayConfig,
) -> Result<(ArrayD<f64>, ArrayD<f64>)> {
    let resolved = los.resolve(points, config.zref, config.raytrace);
    let look_vectors = resolved.as_look_vectors();
    let (hydro, wet) = if config.parallel {
        dispatch::run(model, points, look_vectors, config)?
    } else {
        dispatch::run_serial(model, points, look_vectors, config)?
    };
    Ok((
        ArrayD::from_shape_vec(IxDyn(shape), hydro)?,
        ArrayD::from_shape_vec(IxDyn(shape), wet)?,
    ))
}

/// Hydrostatic and wet delays [m] of a `S+[3]` array of (latitude, longitude, height)
///
/// Both delay arrays have the shape `S`.
pub fn delay_from_grid<M: AtmosphericModel + ?Sized>(
    model: &M,
    llas: ArrayViewD<f64>,
    los: &LineOfSight,
    config: &DelayConfig,
) -> Result<(ArrayD<f64>, ArrayD<f64>)> {
    let shape = match llas.shape().split_last() {
        Some((3, shape)) => shape.to_vec(),
        _ => return Err(Error::CoordinateAxis(llas.shape().to_vec())),
    };
    validate_shapes(&shape, &shape, &shape, los)?;
    let points: Vec<Geodetic> = llas
        .iter()
        .cloned()
        .collect::<Vec<f64>>()
        .chunks_exact(3)
        .map(|lla| Geodetic::new(lla[0], lla[1], lla[2]))
        .collect();
    log::info!("Delays of a {:?} grid ({}) ...", shape, config);
    let now = Instant::now();
    let delays = compute(model, &points, &shape, los, config)?;
    log::info!("... grid done in {:.3}s", now.elapsed().as_secs_f64());
    Ok(delays)
}

/// Hydrostatic and wet delays [m] over the Cartesian product of latitude, longitude and height spans
///
/// The delays have the shape `[heights,latitudes,longitudes]`.
/// The computation is always done in parallel.
pub fn delay_over_area<M: AtmosphericModel + ?Sized>(
    model: &M,
    lat: Span,
    lon: Span,
    height: Span,
    los: &LineOfSight,
    config: &DelayConfig,
) -> Result<(ArrayD<f64>, ArrayD<f64>)> {
    let (lats, lons, heights) = (lat.values(), lon.values(), height.values());
    let shape = vec![heights.len(), lats.len(), lons.len()];
    validate_shapes(&shape, &shape, &shape, los)?;
    let points: Vec<Geodetic> = iproduct!(&heights, &lats, &lons)
        .map(|(&h, &lat, &lon)| Geodetic::new(lat, lon, h))
        .collect();
    let config = config.clone().parallel(true);
    log::info!("Delays over a {:?} area ({}) ...", shape, config);
    let now = Instant::now();
    let delays = compute(model, &points, &shape, los, &config)?;
    log::info!("... area done in {:.3}s", now.elapsed().as_secs_f64());
    Ok(delays)
}

/// Hydrostatic and wet delays [m] of latitude/longitude grids at several heights [m]
///
/// The delays have the shape `[levels]+S` where `S` is the shape of the grids.
pub fn delay_at_height_levels<M: AtmosphericModel + ?Sized>(
    model: &M,
    lats: ArrayViewD<f64>,
    lons: ArrayViewD<f64>,
    levels: &[f64],
    los: &LineOfSight,
    config: &DelayConfig,
) -> Result<(ArrayD<f64>, ArrayD<f64>)> {
    let shape = lats.shape().to_vec();
    validate_shapes(&shape, lons.shape(), &shape, los)?;
    let mut out_shape = vec![levels.len()];
    out_shape.extend_from_slice(&shape);
    if levels.is_empty() {
        return Ok((
            ArrayD::zeros(IxDyn(&out_shape)),
            ArrayD::zeros(IxDyn(&out_shape)),
        ));
    }
    log::info!(
        "Delays of a {:?} grid at {} height levels ({}) ...",
        shape,
        levels.len(),
        config
    );
    let now = Instant::now();
    let pb = ProgressBar::new(levels.len() as u64);
    let (hydro, wet): (Vec<ArrayD<f64>>, Vec<ArrayD<f64>>) = levels
        .iter()
        .progress_with(pb)
        .map(|&height| {
            let points: Vec<Geodetic> = lats
                .iter()
                .zip(lons.iter())
                .map(|(&lat, &lon)| Geodetic::new(lat, lon, height))
                .collect();
            compute(model, &points, &shape, los, config)
                .map(|(h, w)| (h.insert_axis(Axis(0)), w.insert_axis(Axis(0))))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .unzip();
    let stack = |delays: Vec<ArrayD<f64>>| {
        let views: Vec<_> = delays.iter().map(|d| d.view()).collect();
        concatenate(Axis(0), &views)
    };
    let delays = (stack(hydro)?, stack(wet)?);
    log::info!("... levels done in {:.3}s", now.elapsed().as_secs_f64());
    Ok(delays)
}
