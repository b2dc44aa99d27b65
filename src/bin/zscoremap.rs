//! Z-score mapping against a population template
//!
//! Compares a subject volume to template mean and standard-deviation
//! volumes, with optional histogram matching of the subject to the template
//! mean and optional restriction to a labeled region.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use featmap::nifti_io::{read_nifti_file, save_nifti_to_file};
use featmap::zscore::{zscore_map, ZScoreOptions};
use featmap::VolumeError;

#[derive(Parser, Debug)]
#[command(author, version, about = "Voxelwise z-score map of a subject against template statistics")]
struct Args {
    /// Subject volume
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Template mean volume
    #[arg(long)]
    template_mean: PathBuf,

    /// Template standard-deviation volume
    #[arg(long)]
    template_std: PathBuf,

    /// Restrict computation to this label region
    #[arg(long)]
    region_mask: Option<PathBuf>,

    /// Match subject intensities to the template mean before scoring
    #[arg(long)]
    histogram_matching: bool,

    /// Output z-score volume path (written gzip-compressed)
    #[arg(short, long)]
    output: PathBuf,
}

fn run(args: &Args) -> Result<(), VolumeError> {
    let subject = read_nifti_file(&args.input)?;
    let mean = read_nifti_file(&args.template_mean)?;
    let std = read_nifti_file(&args.template_std)?;
    let region = match &args.region_mask {
        Some(path) => Some(read_nifti_file(path)?),
        None => None,
    };

    match &region {
        Some(_) => info!("calculating z-score mapping, region defined in label map"),
        None => info!("calculating z-score mapping, full brain coverage"),
    }

    let opts = ZScoreOptions {
        histogram_match: args.histogram_matching,
        ..Default::default()
    };
    let scores = zscore_map(&subject, &mean, &std, region.as_ref(), &opts)?;

    save_nifti_to_file(&args.output, &scores, true)?;
    info!("wrote {}", args.output.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
