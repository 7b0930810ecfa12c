use crate::{raster::RasterError, station::StationError, weather::ModelError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(
        "lats, lons, heights and line-of-sight must share the same shape: \
         lats {lats:?}, lons {lons:?}, heights {heights:?}, line-of-sight {los:?}"
    )]
    ShapeMismatch {
        lats: Vec<usize>,
        lons: Vec<usize>,
        heights: Vec<usize>,
        los: Option<Vec<usize>>,
    },
    #[error("points must have a trailing (lat,lon,height) axis of size 3, found shape {0:?}")]
    CoordinateAxis(Vec<usize>),
    #[error("sampling step must be finite and positive, found {0}m")]
    InvalidStep(f64),
    #[error("troposphere reference height must be finite, found {0}m")]
    InvalidZref(f64),
    #[error("unknown job type {0:?}, expected \"hydro\" or \"wet\"")]
    UnknownJobType(String),
    #[error("delay computation failed")]
    Model(#[from] ModelError),
    #[error("failed to build the worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to reshape the delays")]
    Shape(#[from] ndarray::ShapeError),
    #[error("raster error")]
    Raster(#[from] RasterError),
    #[error("station file error")]
    Station(#[from] StationError),
}
pub type Result<T> = std::result::Result<T, Error>;
