//! Raster inputs and outputs
//!
//! Latitude, longitude and height rasters are read with a [RasterReader],
//! [NpyRaster] reading `.npy` files.
//! A line-of-sight raster holds 2 bands along its first axis: the incidence angles
//! followed by the heading angles, both in degrees.

use crate::{
    config::DelayConfig,
    grid::{delay_from_grid, validate_shapes},
    los::LineOfSight,
    weather::{AtmosphericModel, DelayKind},
    Result,
};
use ndarray::{stack, ArrayD, Axis, IxDyn, ShapeBuilder};
use npyz::WriterBuilder;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
    time::Instant,
};

#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    #[error("raster {0:?} not found")]
    NotFound(String),
    #[error("failed to read or write a raster")]
    Io(#[from] std::io::Error),
    #[error("raster data does not fit its shape")]
    Shape(#[from] ndarray::ShapeError),
    #[error("line-of-sight raster must have 2 bands (incidence, heading) along its first axis, found shape {0:?}")]
    Bands(Vec<usize>),
}
type RasterResult<T> = std::result::Result<T, RasterError>;

/// Raster reading interface
pub trait RasterReader {
    fn read(&self, path: &Path) -> RasterResult<ArrayD<f64>>;
}

/// `.npy` raster reader
#[derive(Debug, Default, Clone, Copy)]
pub struct NpyRaster;
impl RasterReader for NpyRaster {
    fn read(&self, path: &Path) -> RasterResult<ArrayD<f64>> {
        log::info!("Loading {:?}...", path);
        let file = File::open(path)
            .map_err(|_| RasterError::NotFound(path.to_string_lossy().into_owned()))?;
        let npy = npyz::NpyFile::new(BufReader::new(file))?;
        let shape: Vec<usize> = npy.shape().iter().map(|&n| n as usize).collect();
        let fortran = matches!(npy.order(), npyz::Order::Fortran);
        // single precision rasters are widened
        let single = matches!(
            npy.dtype(),
            npyz::DType::Plain(ts) if ts.to_string().ends_with("f4")
        );
        let data: Vec<f64> = if single {
            npy.into_vec::<f32>()?.into_iter().map(f64::from).collect()
        } else {
            npy.into_vec::<f64>()?
        };
        let raster = if fortran {
            ArrayD::from_shape_vec(IxDyn(&shape).f(), data)?
        } else {
            ArrayD::from_shape_vec(IxDyn(&shape), data)?
        };
        Ok(raster)
    }
}

/// Writes an array to a `.npy` file
pub fn write_npy<P: AsRef<Path>>(path: P, data: &ArrayD<f64>) -> RasterResult<()> {
    let path = path.as_ref();
    log::info!("Writing {:?}...", path);
    let shape: Vec<u64> = data.shape().iter().map(|&n| n as u64).collect();
    let mut file = BufWriter::new(File::create(path)?);
    let mut writer = npyz::WriteOptions::new()
        .default_dtype()
        .shape(&shape)
        .writer(&mut file)
        .begin_nd()?;
    writer.extend(data.iter().cloned())?;
    writer.finish()?;
    Ok(())
}

/// Hydrostatic and wet delay file names
///
/// `{model}_{hydro|wet}_ztd.npy` for zenith delays or
/// `{model}_{hydro|wet}_std.npy` for slant delays.
pub fn output_names(model_name: &str, los_given: bool) -> (String, String) {
    let name = |kind: DelayKind| {
        format!(
            "{}_{}_{}td.npy",
            model_name,
            kind,
            if los_given { "s" } else { "z" }
        )
    };
    (name(DelayKind::Hydrostatic), name(DelayKind::Wet))
}

/// Hydrostatic and wet delays [m] of latitude, longitude and height rasters
///
/// The raster shapes are checked before the line of sight is read
/// and before the model is queried.
pub fn delay_from_files<M, R>(
    model: &M,
    reader: &R,
    lat: &Path,
    lon: &Path,
    height: &Path,
    los: Option<&Path>,
    config: &DelayConfig,
) -> Result<(ArrayD<f64>, ArrayD<f64>)>
where
    M: AtmosphericModel + ?Sized,
    R: RasterReader + ?Sized,
{
    let now = Instant::now();
    let lats = reader.read(lat)?;
    let lons = reader.read(lon)?;
    let heights = reader.read(height)?;
    validate_shapes(
        lats.shape(),
        lons.shape(),
        heights.shape(),
        &LineOfSight::Zenith,
    )?;
    let los = match los {
        Some(path) => {
            let bands = reader.read(path)?;
            let shape = bands.shape().to_vec();
            LineOfSight::from_bands(bands).ok_or(RasterError::Bands(shape))?
        }
        None => LineOfSight::Zenith,
    };
    log::info!("... rasters loaded in {:.3}s", now.elapsed().as_secs_f64());
    let llas = stack(
        Axis(lats.ndim()),
        &[lats.view(), lons.view(), heights.view()],
    )?;
    delay_from_grid(model, llas.view(), &los, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        weather::{ExponentialAtmosphere, ModelError},
        Error,
    };
    use nalgebra::Vector3;
    use std::{
        cell::RefCell,
        collections::HashMap,
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };

    #[derive(Default)]
    struct MemoryRaster {
        rasters: HashMap<PathBuf, ArrayD<f64>>,
        reads: RefCell<Vec<PathBuf>>,
    }
    impl MemoryRaster {
        fn insert(mut self, path: &str, raster: ArrayD<f64>) -> Self {
            self.rasters.insert(PathBuf::from(path), raster);
            self
        }
    }
    impl RasterReader for MemoryRaster {
        fn read(&self, path: &Path) -> RasterResult<ArrayD<f64>> {
            self.reads.borrow_mut().push(path.to_path_buf());
            self.rasters
                .get(path)
                .cloned()
                .ok_or_else(|| RasterError::NotFound(path.to_string_lossy().into_owned()))
        }
    }

    #[derive(Default)]
    struct Counting {
        queries: AtomicUsize,
    }
    impl AtmosphericModel for Counting {
        fn hydrostatic_delay(
            &self,
            positions: &[Vector3<f64>],
        ) -> std::result::Result<Vec<f64>, ModelError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(vec![100.; positions.len()])
        }
        fn wet_delay(
            &self,
            positions: &[Vector3<f64>],
        ) -> std::result::Result<Vec<f64>, ModelError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(vec![10.; positions.len()])
        }
    }

    fn zeros(shape: &[usize]) -> ArrayD<f64> {
        ArrayD::zeros(IxDyn(shape))
    }

    #[test]
    fn shape_mismatch_before_queries() {
        let reader = MemoryRaster::default()
            .insert("lat", zeros(&[10, 10]))
            .insert("lon", zeros(&[5, 5]))
            .insert("hgt", zeros(&[10, 10]))
            .insert("los", zeros(&[2, 10, 10]));
        let model = Counting::default();
        let result = delay_from_files(
            &model,
            &reader,
            Path::new("lat"),
            Path::new("lon"),
            Path::new("hgt"),
            Some(Path::new("los")),
            &DelayConfig::default(),
        );
        match result {
            Err(Error::ShapeMismatch { lats, lons, .. }) => {
                assert_eq!(lats, vec![10, 10]);
                assert_eq!(lons, vec![5, 5]);
            }
            other => panic!("expected a shape mismatch, got {other:?}"),
        }
        assert_eq!(model.queries.load(Ordering::SeqCst), 0);
        assert!(!reader.reads.borrow().contains(&PathBuf::from("los")));
    }

    #[test]
    fn los_shape_mismatch() {
        let reader = MemoryRaster::default()
            .insert("lat", zeros(&[3, 4]))
            .insert("lon", zeros(&[3, 4]))
            .insert("hgt", zeros(&[3, 4]))
            .insert("los", zeros(&[2, 4, 3]))
            .insert("bands", zeros(&[3, 3, 4]));
        let model = Counting::default();
        let from = |los: &str| {
            delay_from_files(
                &model,
                &reader,
                Path::new("lat"),
                Path::new("lon"),
                Path::new("hgt"),
                Some(Path::new(los)),
                &DelayConfig::default(),
            )
        };
        assert!(matches!(from("los"), Err(Error::ShapeMismatch { .. })));
        assert!(matches!(
            from("bands"),
            Err(Error::Raster(RasterError::Bands(_)))
        ));
        assert!(matches!(
            from("missing"),
            Err(Error::Raster(RasterError::NotFound(_)))
        ));
        assert_eq!(model.queries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn delays_from_rasters() {
        let lats = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![0., 0., 1., 1.]).unwrap();
        let lons = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![0., 1., 0., 1.]).unwrap();
        let hgts = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![0., 100., 200., 300.]).unwrap();
        let reader = MemoryRaster::default()
            .insert("lat", lats)
            .insert("lon", lons)
            .insert("hgt", hgts);
        let model = Counting::default();
        let (hydro, wet) = delay_from_files(
            &model,
            &reader,
            Path::new("lat"),
            Path::new("lon"),
            Path::new("hgt"),
            None,
            &DelayConfig::default(),
        )
        .unwrap();
        assert_eq!(hydro.shape(), &[2, 2]);
        assert!((hydro[[1, 1]] - 1e-6 * 100. * 14_700.).abs() < 1e-9);
        assert!((wet[[0, 1]] - 1e-6 * 10. * 14_900.).abs() < 1e-9);
        assert_eq!(model.queries.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn npy_round_trip() {
        let path = std::env::temp_dir().join(format!("tropo-raster-{}.npy", std::process::id()));
        let data = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1., 2., 3., 4., 5., 6.]).unwrap();
        write_npy(&path, &data).unwrap();
        let read = NpyRaster.read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(read, data);
    }

    #[test]
    fn single_precision_raster() {
        let path =
            std::env::temp_dir().join(format!("tropo-raster-f4-{}.npy", std::process::id()));
        {
            let mut file = BufWriter::new(File::create(&path).unwrap());
            let mut writer = npyz::WriteOptions::new()
                .default_dtype()
                .shape(&[2, 2])
                .writer(&mut file)
                .begin_nd()
                .unwrap();
            writer.extend(vec![0.5f32, -1.25, 120., 3.]).unwrap();
            writer.finish().unwrap();
        }
        let read = NpyRaster.read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(read.shape(), &[2, 2]);
        assert_eq!(read.iter().cloned().collect::<Vec<f64>>(), vec![0.5, -1.25, 120., 3.]);
    }

    #[test]
    fn names() {
        assert_eq!(
            output_names("ERA5", false),
            ("ERA5_hydro_ztd.npy".to_string(), "ERA5_wet_ztd.npy".to_string())
        );
        assert_eq!(output_names("exp", true).1, "exp_wet_std.npy");
    }

    #[test]
    fn exponential_rasters() {
        let reader = MemoryRaster::default()
            .insert("lat", zeros(&[3]))
            .insert("lon", zeros(&[3]))
            .insert("hgt", zeros(&[3]));
        let (hydro, _) = delay_from_files(
            &ExponentialAtmosphere::default(),
            &reader,
            Path::new("lat"),
            Path::new("lon"),
            Path::new("hgt"),
            None,
            &DelayConfig::default().step(100.),
        )
        .unwrap();
        assert!(hydro.iter().all(|&d| d > 1.85 && d < 1.95));
    }
}
