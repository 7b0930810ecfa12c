//! Parallel dispatch of the delay computation
//!
//! Half of the workers compute hydrostatic delays and the other half wet delays,
//! each half splitting the points into contiguous slices of equal sizes (±1).
//! Every (component, slice) pair is a job; all the jobs go into a single pool
//! of workers which write the delays of a job into the matching slice of
//! pre-allocated buffers. Jobs never overlap so the buffers need no lock.

use crate::{
    config::DelayConfig,
    geodesy::Geodetic,
    los::LookVectors,
    ray::build_rays,
    sampler::integrate,
    weather::{AtmosphericModel, DelayKind},
    Error, Result,
};
use rayon::prelude::*;
use std::{fmt, ops::Range, time::Instant};

/// A unit of work: the delays of one component for a range of points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub kind: DelayKind,
    pub range: Range<usize>,
}
impl Job {
    pub fn new(kind: DelayKind, range: Range<usize>) -> Self {
        Self { kind, range }
    }
    /// Delays [m] of the job points
    pub fn compute<M: AtmosphericModel + ?Sized>(
        &self,
        model: &M,
        points: &[Geodetic],
        look_vectors: LookVectors,
        config: &DelayConfig,
    ) -> Result<Vec<f64>> {
        let bundle = build_rays(
            &points[self.range.clone()],
            look_vectors.slice(self.range.clone()),
            config.zref,
        );
        Ok(integrate(
            model,
            self.kind,
            &bundle,
            config.step,
            config.zref,
        )?)
    }
}
impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..{}]", self.kind, self.range.start, self.range.end)
    }
}

/// Splits `[0,n)` into `parts` contiguous ranges which lengths differ by 1 at most
///
/// The range bounds are `i*n/parts` for `i` in `0..=parts`.
pub fn partition(n: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    (0..parts).map(|i| i * n / parts..(i + 1) * n / parts).collect()
}

/// Number of hydrostatic and wet workers
pub fn split_workers(workers: usize) -> (usize, usize) {
    let hydro = workers / 2;
    (hydro.max(1), (workers - hydro).max(1))
}

/// The hydrostatic jobs followed by the wet jobs for `n` points
pub fn plan(n: usize, workers: usize) -> Vec<Job> {
    let (n_hydro, n_wet) = split_workers(workers);
    partition(n, n_hydro)
        .into_iter()
        .map(|range| Job::new(DelayKind::Hydrostatic, range))
        .chain(
            partition(n, n_wet)
                .into_iter()
                .map(|range| Job::new(DelayKind::Wet, range)),
        )
        .collect()
}

/// Splits `buffer` into consecutive slices of the lengths of `ranges`
fn carve<'a>(mut buffer: &'a mut [f64], ranges: &[Range<usize>]) -> Vec<&'a mut [f64]> {
    ranges
        .iter()
        .map(|range| {
            let (head, tail) = std::mem::take(&mut buffer).split_at_mut(range.len());
            buffer = tail;
            head
        })
        .collect()
}

/// Checks that there is one look vector per point
fn check_lengths(points: &[Geodetic], look_vectors: &LookVectors) -> Result<()> {
    match look_vectors.len() {
        Some(len) if len != points.len() => Err(Error::ShapeMismatch {
            lats: vec![points.len()],
            lons: vec![points.len()],
            heights: vec![points.len()],
            los: Some(vec![len]),
        }),
        _ => Ok(()),
    }
}

/// Hydrostatic and wet delays [m] of all the points, computed in parallel
pub fn run<M: AtmosphericModel + ?Sized>(
    model: &M,
    points: &[Geodetic],
    look_vectors: LookVectors,
    config: &DelayConfig,
) -> Result<(Vec<f64>, Vec<f64>)> {
    config.validate()?;
    check_lengths(points, &look_vectors)?;
    let n = points.len();
    let jobs = plan(n, config.workers);
    log::info!(
        "Dispatching {} points as {} jobs over {} workers ...",
        n,
        jobs.len(),
        config.workers
    );
    let now = Instant::now();

    let mut hydro = vec![0f64; n];
    let mut wet = vec![0f64; n];
    let (hydro_jobs, wet_jobs): (Vec<Job>, Vec<Job>) = jobs
        .into_iter()
        .partition(|job| job.kind == DelayKind::Hydrostatic);
    let hydro_ranges: Vec<_> = hydro_jobs.iter().map(|job| job.range.clone()).collect();
    let wet_ranges: Vec<_> = wet_jobs.iter().map(|job| job.range.clone()).collect();
    let units: Vec<(Job, &mut [f64])> = hydro_jobs
        .into_iter()
        .zip(carve(&mut hydro, &hydro_ranges))
        .chain(wet_jobs.into_iter().zip(carve(&mut wet, &wet_ranges)))
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()?;
    pool.install(|| {
        units
            .into_par_iter()
            .with_max_len(1)
            .try_for_each(|(job, slot)| -> Result<()> {
                let delays = job.compute(model, points, look_vectors, config)?;
                slot.copy_from_slice(&delays);
                log::debug!("job {} done", job);
                Ok(())
            })
    })?;

    log::info!("... computed in {:.3}s", now.elapsed().as_secs_f64());
    Ok((hydro, wet))
}

/// Hydrostatic and wet delays [m] of all the points, computed on the calling thread
pub fn run_serial<M: AtmosphericModel + ?Sized>(
    model: &M,
    points: &[Geodetic],
    look_vectors: LookVectors,
    config: &DelayConfig,
) -> Result<(Vec<f64>, Vec<f64>)> {
    config.validate()?;
    check_lengths(points, &look_vectors)?;
    let all = 0..points.len();
    let hydro = Job::new(DelayKind::Hydrostatic, all.clone()).compute(
        model,
        points,
        look_vectors,
        config,
    )?;
    let wet = Job::new(DelayKind::Wet, all).compute(model, points, look_vectors, config)?;
    Ok((hydro, wet))
}
