use std::path::PathBuf;
use structopt::StructOpt;
use tropo_raytrace::{NpyRaster, RasterReader};

mod stats;
use stats::DelayStats;

#[derive(Debug, StructOpt)]
#[structopt(name = "delay-stats", about = "Tropospheric delay maps statistics")]
struct Opt {
    /// Delay maps (*.npy*)
    #[structopt(parse(from_os_str), required = true)]
    paths: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    for path in &opt.paths {
        let delays = NpyRaster.read(path)?;
        let name = path
            .file_stem()
            .and_then(|x| x.to_str())
            .unwrap_or("delays");
        println!("{}", DelayStats::new(name, delays.iter().cloned()));
    }
    Ok(())
}
