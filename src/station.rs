//! GNSS station files
//!
//! Stations are read from a CSV file, optionally gzip compressed, with the
//! columns `Lat`, `Lon` and an optional `Hgt` [m].
//! Other columns are ignored.

use crate::{
    config::DelayConfig,
    geodesy::Geodetic,
    grid::delay_from_grid,
    los::LineOfSight,
    weather::AtmosphericModel,
};
use flate2::read::GzDecoder;
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

#[derive(thiserror::Error, Debug)]
pub enum StationError {
    #[error("Failed to open the station file")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize the station CSV file")]
    Csv(#[from] csv::Error),
    #[error("station file has no station")]
    Empty,
}
type Result<T> = std::result::Result<T, StationError>;

/// A station location
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Station {
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Hgt", default)]
    pub height: f64,
}
impl From<&Station> for Geodetic {
    fn from(station: &Station) -> Self {
        Geodetic::new(station.lat, station.lon, station.height)
    }
}

/// Zenith delays [m] at a station
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct StationDelay {
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Hgt")]
    pub height: f64,
    #[serde(rename = "hydroDelay")]
    pub hydrostatic: f64,
    #[serde(rename = "wetDelay")]
    pub wet: f64,
    #[serde(rename = "totalDelay")]
    pub total: f64,
}

/// Reads the stations of a CSV file, decompressed if the extension is `gz`
pub fn read_stations<P: AsRef<Path>>(path: P) -> Result<Vec<Station>> {
    let path = path.as_ref();
    log::info!("Loading {:?}...", path);
    let mut file = BufReader::new(File::open(path)?);
    let mut contents = String::new();
    if path.extension().and_then(|x| x.to_str()) == Some("gz") {
        GzDecoder::new(file).read_to_string(&mut contents)?;
    } else {
        file.read_to_string(&mut contents)?;
    }
    let stations = stations_from_reader(contents.as_bytes())?;
    log::info!("... {} stations loaded", stations.len());
    Ok(stations)
}
pub fn stations_from_reader<R: Read>(reader: R) -> Result<Vec<Station>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let stations = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<Station>, csv::Error>>()?;
    if stations.is_empty() {
        Err(StationError::Empty)
    } else {
        Ok(stations)
    }
}

/// Zenith delays at the stations
pub fn station_delays<M: AtmosphericModel + ?Sized>(
    model: &M,
    stations: &[Station],
    config: &DelayConfig,
) -> crate::Result<Vec<StationDelay>> {
    let llas: Vec<f64> = stations
        .iter()
        .flat_map(|s| [s.lat, s.lon, s.height])
        .collect();
    let llas = ArrayD::from_shape_vec(IxDyn(&[stations.len(), 3]), llas)?;
    let (hydro, wet) = delay_from_grid(model, llas.view(), &LineOfSight::Zenith, config)?;
    Ok(stations
        .iter()
        .zip(hydro.iter().zip(wet.iter()))
        .map(|(s, (&hydrostatic, &wet))| StationDelay {
            lat: s.lat,
            lon: s.lon,
            height: s.height,
            hydrostatic,
            wet,
            total: hydrostatic + wet,
        })
        .collect())
}

/// Writes the station delays to a CSV file
pub fn write_station_delays<P: AsRef<Path>>(path: P, delays: &[StationDelay]) -> Result<()> {
    let path = path.as_ref();
    log::info!("Writing {:?}...", path);
    let mut wtr = csv::Writer::from_path(path)?;
    for delay in delays {
        wtr.serialize(delay)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::ConstantAtmosphere;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    const STATIONS: &str = "ID,Lat,Lon,Hgt\nP001,34.1,-118.2,250\nP002,35.0,-117.5,1250.5\n";

    #[test]
    fn read_with_heights() {
        let stations = stations_from_reader(STATIONS.as_bytes()).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1], Station {
            lat: 35.,
            lon: -117.5,
            height: 1250.5
        });
    }

    #[test]
    fn missing_heights() {
        let stations = stations_from_reader("Lat,Lon\n1.5,2.5\n".as_bytes()).unwrap();
        assert_eq!(stations[0].height, 0.);
        assert!(matches!(
            stations_from_reader("Lat,Lon\n".as_bytes()),
            Err(StationError::Empty)
        ));
        assert!(stations_from_reader("Lon\n2.5\n".as_bytes()).is_err());
    }

    #[test]
    fn gzipped_file() {
        let path = std::env::temp_dir().join(format!("tropo-stations-{}.csv.gz", std::process::id()));
        let mut gz = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        gz.write_all(STATIONS.as_bytes()).unwrap();
        gz.finish().unwrap();
        let stations = read_stations(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(stations.len(), 2);
    }

    #[test]
    fn delays_and_output() {
        let stations = stations_from_reader(STATIONS.as_bytes()).unwrap();
        let model = ConstantAtmosphere::new(200., 20.);
        let delays = station_delays(&model, &stations, &DelayConfig::default()).unwrap();
        let exact = 1e-6 * 220. * (15_000. - 250.);
        assert!((delays[0].total - exact).abs() < 1e-9);
        assert_eq!(delays[1].total, delays[1].hydrostatic + delays[1].wet);

        let path = std::env::temp_dir().join(format!("tropo-delays-{}.csv", std::process::id()));
        write_station_delays(&path, &delays).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            contents.lines().next(),
            Some("Lat,Lon,Hgt,hydroDelay,wetDelay,totalDelay")
        );
        assert_eq!(contents.lines().count(), 3);
    }
}
