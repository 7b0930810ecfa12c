//! Vertical weather profile
//!
//! Pressure, temperature and water vapor partial pressure sampled along the vertical
//! and loaded from a CSV file, optionally gzip compressed (*.csv.gz*).

use super::{AtmosphericModel, ModelError, Result};
use crate::geodesy::ecef_to_geodetic;
use flate2::read::GzDecoder;
use nalgebra::Vector3;
use serde::Deserialize;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

/// Refractivity constants [K/Pa], [K/Pa], [K^2/Pa]
pub const K1: f64 = 0.776;
pub const K2: f64 = 0.233;
pub const K3: f64 = 3.75e3;

#[derive(thiserror::Error, Debug)]
pub enum ProfileError {
    #[error("Failed to open the weather profile")]
    Io(#[from] std::io::Error),
    #[error("Failed to deserialize the CSV file")]
    Csv(#[from] csv::Error),
    #[error("weather profile must have at least 2 levels, found {0}")]
    TooShort(usize),
    #[error("weather profile columns have different lengths")]
    Length,
    #[error("weather profile heights must be strictly increasing (level #{0})")]
    Unordered(usize),
    #[error("invalid temperature {0}K at level #{1}")]
    Temperature(f64, usize),
}

#[derive(Deserialize, Debug)]
struct Record {
    #[serde(rename = "Height (m)")]
    height: f64,
    #[serde(rename = "Pressure (Pa)")]
    pressure: f64,
    #[serde(rename = "Temperature (K)")]
    temperature: f64,
    #[serde(rename = "Vapor pressure (Pa)")]
    vapor_pressure: f64,
}

/// Horizontally uniform atmosphere interpolated from a vertical profile
#[derive(Debug, Clone, Default)]
pub struct ProfileAtmosphere {
    // the profile heights [m], increasing
    height: Vec<f64>,
    // the hydrostatic refractivity at each height
    hydrostatic: Vec<f64>,
    // the wet refractivity at each height
    wet: Vec<f64>,
}
impl ProfileAtmosphere {
    /// Creates a profile from heights [m], pressures [Pa], temperatures [K] and vapor pressures [Pa]
    pub fn new(
        height: Vec<f64>,
        pressure: &[f64],
        temperature: &[f64],
        vapor_pressure: &[f64],
    ) -> std::result::Result<Self, ProfileError> {
        if height.len() < 2 {
            return Err(ProfileError::TooShort(height.len()));
        }
        if [pressure.len(), temperature.len(), vapor_pressure.len()]
            .iter()
            .any(|&n| n != height.len())
        {
            return Err(ProfileError::Length);
        }
        if let Some(i) = height.windows(2).position(|h| h[1] <= h[0]) {
            return Err(ProfileError::Unordered(i + 1));
        }
        let mut hydrostatic = Vec::with_capacity(height.len());
        let mut wet = Vec::with_capacity(height.len());
        for (i, ((&p, &t), &e)) in pressure
            .iter()
            .zip(temperature)
            .zip(vapor_pressure)
            .enumerate()
        {
            if !(t > 0.) {
                return Err(ProfileError::Temperature(t, i));
            }
            hydrostatic.push(K1 * p / t);
            wet.push(K2 * e / t + K3 * e / (t * t));
        }
        Ok(Self {
            height,
            hydrostatic,
            wet,
        })
    }
    /// Loads a profile from a CSV file with the columns
    /// "Height (m)", "Pressure (Pa)", "Temperature (K)" and "Vapor pressure (Pa)"
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ProfileError> {
        let path = path.as_ref();
        log::info!("Loading {:?}...", path);
        let mut file = BufReader::new(File::open(path)?);
        let mut contents = String::new();
        if path.extension().and_then(|x| x.to_str()) == Some("gz") {
            GzDecoder::new(file).read_to_string(&mut contents)?;
        } else {
            file.read_to_string(&mut contents)?;
        }
        Self::from_reader(contents.as_bytes())
    }
    pub fn from_reader<R: Read>(reader: R) -> std::result::Result<Self, ProfileError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let (mut height, mut pressure, mut temperature, mut vapor_pressure) =
            (vec![], vec![], vec![], vec![]);
        for result in rdr.deserialize() {
            let record: Record = result?;
            height.push(record.height);
            pressure.push(record.pressure);
            temperature.push(record.temperature);
            vapor_pressure.push(record.vapor_pressure);
        }
        Self::new(height, &pressure, &temperature, &vapor_pressure)
    }
    pub fn len(&self) -> usize {
        self.height.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Linear interpolation of `values` at `height`, clamped to the profile range
    fn interpolate(&self, values: &[f64], height: f64) -> f64 {
        let n = self.height.len();
        if height <= self.height[0] {
            return values[0];
        }
        if height >= self.height[n - 1] {
            return values[n - 1];
        }
        let i = self.height.partition_point(|&h| h <= height) - 1;
        let w = (height - self.height[i]) / (self.height[i + 1] - self.height[i]);
        values[i] + w * (values[i + 1] - values[i])
    }
    fn query(&self, values: &[f64], positions: &[Vector3<f64>]) -> Result<Vec<f64>> {
        if self.is_empty() {
            return Err(ModelError::new("empty weather profile"));
        }
        positions
            .iter()
            .map(|xyz| {
                let height = ecef_to_geodetic(xyz).height;
                if height.is_finite() {
                    Ok(self.interpolate(values, height))
                } else {
                    Err(ModelError::new(format!("non finite position {:?}", xyz)))
                }
            })
            .collect()
    }
}
impl AtmosphericModel for ProfileAtmosphere {
    fn hydrostatic_delay(&self, positions: &[Vector3<f64>]) -> Result<Vec<f64>> {
        self.query(&self.hydrostatic, positions)
    }
    fn wet_delay(&self, positions: &[Vector3<f64>]) -> Result<Vec<f64>> {
        self.query(&self.wet, positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::Geodetic;

    const PROFILE: &str = "Height (m),Pressure (Pa),Temperature (K),Vapor pressure (Pa)
0,101325,288.15,1500
5000,54020,255.65,200
15000,12045,216.65,0
";

    #[test]
    fn load_profile() {
        let profile = ProfileAtmosphere::from_reader(PROFILE.as_bytes()).unwrap();
        assert_eq!(profile.len(), 3);
        let xyz = vec![Geodetic::new(0., 0., 0.).to_ecef()];
        let n = profile.hydrostatic_delay(&xyz).unwrap();
        assert!((n[0] - K1 * 101325. / 288.15).abs() < 1e-3);
    }

    #[test]
    fn linear_interpolation() {
        let profile = ProfileAtmosphere::from_reader(PROFILE.as_bytes()).unwrap();
        let xyz: Vec<_> = [2_500., 20_000., -100.]
            .iter()
            .map(|&h| Geodetic::new(30., 60., h).to_ecef())
            .collect();
        let n = profile.wet_delay(&xyz).unwrap();
        let wet = |e: f64, t: f64| K2 * e / t + K3 * e / (t * t);
        let mid = 0.5 * (wet(1500., 288.15) + wet(200., 255.65));
        assert!((n[0] - mid).abs() < 1e-4);
        assert!(n[1].abs() < 1e-12);
        assert!((n[2] - wet(1500., 288.15)).abs() < 1e-9);
    }

    #[test]
    fn unordered_profile() {
        let csv = "Height (m),Pressure (Pa),Temperature (K),Vapor pressure (Pa)
0,101325,288.15,1500
0,54020,255.65,200
";
        assert!(matches!(
            ProfileAtmosphere::from_reader(csv.as_bytes()),
            Err(ProfileError::Unordered(1))
        ));
    }

    #[test]
    fn bad_temperature() {
        let result = ProfileAtmosphere::new(vec![0., 1.], &[1., 1.], &[280., 0.], &[0., 0.]);
        assert!(matches!(result, Err(ProfileError::Temperature(_, 1))));
    }
}
