use crate::{Error, Result};
use std::{fmt, num::NonZeroUsize, thread};

/// Sampling interval along the rays [m]
pub const STEP: f64 = 15.;
/// Top of the troposphere [m]
pub const ZREF: f64 = 15_000.;

/// Delay computation settings
#[derive(Debug, Clone, PartialEq)]
pub struct DelayConfig {
    pub(crate) step: f64,
    pub(crate) zref: f64,
    pub(crate) raytrace: bool,
    pub(crate) parallel: bool,
    pub(crate) workers: usize,
}
impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            step: STEP,
            zref: ZREF,
            raytrace: true,
            parallel: false,
            workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}
impl DelayConfig {
    /// Sets the sampling interval [m]
    pub fn step(self, step: f64) -> Self {
        Self { step, ..self }
    }
    /// Sets the troposphere reference height [m]
    pub fn zref(self, zref: f64) -> Self {
        Self { zref, ..self }
    }
    /// Full 3D integration along the line of sight (`true`)
    /// or vertical integration with the secant projection (`false`)
    pub fn raytrace(self, raytrace: bool) -> Self {
        Self { raytrace, ..self }
    }
    pub fn parallel(self, parallel: bool) -> Self {
        Self { parallel, ..self }
    }
    /// Sets the number of workers in parallel mode, at least 1
    pub fn workers(self, workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            ..self
        }
    }
    /// Checks that the step is finite and positive and that the reference height is finite
    pub fn validate(&self) -> Result<()> {
        if !(self.step.is_finite() && self.step > 0.) {
            return Err(Error::InvalidStep(self.step));
        }
        if !self.zref.is_finite() {
            return Err(Error::InvalidZref(self.zref));
        }
        Ok(())
    }
    pub fn get_step(&self) -> f64 {
        self.step
    }
    pub fn get_zref(&self) -> f64 {
        self.zref
    }
    pub fn is_raytrace(&self) -> bool {
        self.raytrace
    }
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }
    pub fn get_workers(&self) -> usize {
        self.workers
    }
}
impl fmt::Display for DelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step: {}m, zref: {}m, {}, {}",
            self.step,
            self.zref,
            if self.raytrace {
                "ray tracing"
            } else {
                "projection"
            },
            if self.parallel {
                format!("{} workers", self.workers)
            } else {
                "serial".to_string()
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let config = DelayConfig::default()
            .step(10.)
            .zref(12_000.)
            .raytrace(false)
            .parallel(true)
            .workers(0);
        assert_eq!(config.get_step(), 10.);
        assert_eq!(config.get_zref(), 12_000.);
        assert!(!config.is_raytrace());
        assert!(config.is_parallel());
        assert_eq!(config.get_workers(), 1);
        assert_eq!(
            config.to_string(),
            "step: 10m, zref: 12000m, projection, 1 workers"
        );
    }

    #[test]
    fn defaults() {
        let config = DelayConfig::default();
        assert_eq!(config.get_step(), STEP);
        assert_eq!(config.get_zref(), ZREF);
        assert!(config.is_raytrace());
        assert!(!config.is_parallel());
        assert!(config.get_workers() >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_settings() {
        for step in [0., -15., f64::NAN, f64::INFINITY] {
            assert!(matches!(
                DelayConfig::default().step(step).validate(),
                Err(Error::InvalidStep(_))
            ));
        }
        assert!(matches!(
            DelayConfig::default().zref(f64::NAN).validate(),
            Err(Error::InvalidZref(_))
        ));
    }
}
