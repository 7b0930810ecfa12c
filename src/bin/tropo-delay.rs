use anyhow::{bail, Context};
use ndarray::{Array2, ArrayD};
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use tropo_raytrace::{
    delay_at_height_levels, delay_from_files, delay_over_area, parse_component,
    raster::{output_names, write_npy},
    station::{read_stations, station_delays, write_station_delays},
    AtmosphericModel, DelayConfig, DelayKind, ExponentialAtmosphere, LineOfSight, NpyRaster,
    ProfileAtmosphere, RasterReader, Span,
};

#[derive(Debug, StructOpt)]
#[structopt(name = "tropo-delay", about = "Tropospheric delays by ray tracing")]
struct Opt {
    /// Weather profile CSV file (*.csv* or *.csv.gz*), the exponential atmosphere if omitted
    #[structopt(long, parse(from_os_str))]
    profile: Option<PathBuf>,
    /// Latitude raster [deg] (*.npy*)
    #[structopt(long, parse(from_os_str), requires = "lon")]
    lat: Option<PathBuf>,
    /// Longitude raster [deg] (*.npy*)
    #[structopt(long, parse(from_os_str), requires = "lat")]
    lon: Option<PathBuf>,
    /// Height raster [m] (*.npy*)
    #[structopt(long, parse(from_os_str))]
    hgt: Option<PathBuf>,
    /// Bounding box: south north west east [deg]
    #[structopt(long, number_of_values = 4, allow_hyphen_values = true)]
    bbox: Option<Vec<f64>>,
    /// Bounding box resolution [deg]
    #[structopt(long, default_value = "0.1")]
    res: f64,
    /// Bounding box heights: start stop step [m]
    #[structopt(long, number_of_values = 3)]
    heights: Option<Vec<f64>>,
    /// Station CSV file with Lat, Lon and, optionally, Hgt columns
    #[structopt(long, parse(from_os_str))]
    station: Option<PathBuf>,
    /// Height levels [m], replacing the height raster
    #[structopt(long = "heightlvs")]
    height_levels: Vec<f64>,
    /// Line-of-sight raster: incidence and heading bands [deg] (*.npy*)
    #[structopt(long, parse(from_os_str))]
    los: Option<PathBuf>,
    /// Vertical integration with the secant projection instead of ray tracing
    #[structopt(long)]
    no_raytrace: bool,
    /// Computes the delays on a single thread
    #[structopt(long)]
    serial: bool,
    /// Number of parallel workers
    #[structopt(short, long)]
    workers: Option<usize>,
    /// Sampling interval along the rays [m]
    #[structopt(long, default_value = "15")]
    step: f64,
    /// Troposphere reference height [m]
    #[structopt(long, default_value = "15000")]
    zref: f64,
    /// Output directory
    #[structopt(long, parse(from_os_str), default_value = ".")]
    out: PathBuf,
    /// Writes only one delay component: hydro or wet
    #[structopt(long)]
    component: Option<String>,
}

fn write_delays(
    out: &Path,
    model_name: &str,
    los_given: bool,
    component: Option<DelayKind>,
    (hydro, wet): (ArrayD<f64>, ArrayD<f64>),
) -> anyhow::Result<()> {
    let (hydro_name, wet_name) = output_names(model_name, los_given);
    if component != Some(DelayKind::Wet) {
        write_npy(out.join(hydro_name), &hydro)?;
    }
    if component != Some(DelayKind::Hydrostatic) {
        write_npy(out.join(wet_name), &wet)?;
    }
    Ok(())
}

fn read_los(path: Option<&PathBuf>) -> anyhow::Result<LineOfSight> {
    match path {
        Some(path) => {
            let bands = NpyRaster.read(path)?;
            let shape = bands.shape().to_vec();
            LineOfSight::from_bands(bands).with_context(|| {
                format!("{:?}: expected 2 line-of-sight bands, found shape {:?}", path, shape)
            })
        }
        None => Ok(LineOfSight::Zenith),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let component = opt.component.as_deref().map(parse_component).transpose()?;

    let model: Box<dyn AtmosphericModel> = match &opt.profile {
        Some(path) => Box::new(ProfileAtmosphere::from_path(path)?),
        None => Box::new(ExponentialAtmosphere::default()),
    };
    let model_name = opt
        .profile
        .as_ref()
        .and_then(|path| path.file_name())
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .unwrap_or("exp")
        .to_string();

    let mut config = DelayConfig::default()
        .step(opt.step)
        .zref(opt.zref)
        .raytrace(!opt.no_raytrace)
        .parallel(!opt.serial);
    if let Some(workers) = opt.workers {
        config = config.workers(workers);
    }
    config.validate()?;
    log::info!("{} ({})", model_name, config);
    let model = model.as_ref();
    std::fs::create_dir_all(&opt.out)?;
    let los_given = opt.los.is_some();

    if let Some(path) = &opt.station {
        if los_given {
            bail!("station delays are zenith delays, --los is not supported with --station");
        }
        let stations = read_stations(path)?;
        let delays = station_delays(model, &stations, &config)?;
        write_station_delays(opt.out.join(format!("{}_delays.csv", model_name)), &delays)?;
        return Ok(());
    }

    let delays = match (&opt.lat, &opt.lon, &opt.bbox) {
        (Some(lat), Some(lon), None) if !opt.height_levels.is_empty() => {
            let lats = NpyRaster.read(lat)?;
            let lons = NpyRaster.read(lon)?;
            let los = read_los(opt.los.as_ref())?;
            delay_at_height_levels(
                model,
                lats.view(),
                lons.view(),
                &opt.height_levels,
                &los,
                &config,
            )?
        }
        (Some(lat), Some(lon), None) => {
            let hgt = opt
                .hgt
                .as_ref()
                .context("--hgt or --heightlvs is required with --lat and --lon")?;
            delay_from_files(
                model,
                &NpyRaster,
                lat,
                lon,
                hgt,
                opt.los.as_deref(),
                &config,
            )?
        }
        (None, None, Some(bbox)) => {
            let (south, north, west, east) = (bbox[0], bbox[1], bbox[2], bbox[3]);
            if south >= north || west >= east {
                bail!("invalid bounding box {:?}", bbox);
            }
            let lat = Span::new(south, north, opt.res);
            let lon = Span::new(west, east, opt.res);
            let los = read_los(opt.los.as_ref())?;
            if opt.height_levels.is_empty() {
                let height = match opt.heights.as_deref() {
                    Some(&[start, stop, step]) => Span::new(start, stop, step),
                    _ => Span::value(0.),
                };
                delay_over_area(model, lat, lon, height, &los, &config)?
            } else {
                let (lats, lons) = (lat.values(), lon.values());
                let shape = (lats.len(), lons.len());
                let lat_grid = Array2::from_shape_fn(shape, |(i, _)| lats[i]).into_dyn();
                let lon_grid = Array2::from_shape_fn(shape, |(_, j)| lons[j]).into_dyn();
                delay_at_height_levels(
                    model,
                    lat_grid.view(),
                    lon_grid.view(),
                    &opt.height_levels,
                    &los,
                    &config,
                )?
            }
        }
        _ => bail!("one of --lat/--lon, --bbox or --station is required"),
    };

    write_delays(&opt.out, &model_name, los_given, component, delays)?;
    Ok(())
}
