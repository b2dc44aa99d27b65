//! Joint feature information map
//!
//! Fuses co-registered feature volumes into a single weighted joint map,
//! with optional masking, percentile-based outlier removal, and rescaling
//! into a [0,1] weighting map.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use featmap::fusion::{fuse, MaskPolicy};
use featmap::histogram::BinningRule;
use featmap::mask::apply_mask;
use featmap::nifti_io::{read_nifti_file, save_nifti_to_file};
use featmap::outlier::remove_outliers;
use featmap::rescale::rescale_to_unit;
use featmap::VolumeError;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fuse co-registered feature maps into a joint information map")]
struct Args {
    /// Input feature volume (repeat for each feature, all co-registered)
    #[arg(short = 'i', long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Feature weight (repeat to match inputs; defaults to 1.0 each)
    #[arg(short = 'w', long = "weight")]
    weights: Vec<f64>,

    /// Label mask applied to every input before fusion
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Zero out voxels outside histogram-derived percentile bounds
    #[arg(long)]
    outlier_removal: bool,

    /// Lower percentile cut, fraction in [0,1]
    #[arg(long, default_value_t = 0.02)]
    lower_cut: f64,

    /// Upper percentile cut, fraction in [0,1]
    #[arg(long, default_value_t = 0.98)]
    upper_cut: f64,

    /// Histogram binning rule for the outlier bounds
    #[arg(long, default_value = "sqrt-range", value_parser = ["sqrt-range", "sturges"])]
    binning: String,

    /// How zero-valued feature samples enter the weighted average
    #[arg(long, default_value = "include-zeroed", value_parser = ["include-zeroed", "exclude-masked"])]
    mask_policy: String,

    /// Rescale the joint map into a [0,1] weighting map
    #[arg(long)]
    transform_weighting: bool,

    /// Output volume path (written gzip-compressed)
    #[arg(short, long)]
    output: PathBuf,
}

fn run(args: &Args) -> Result<(), VolumeError> {
    info!("joint information from:");
    for path in &args.inputs {
        info!("  {}", path.display());
    }

    let weights = if args.weights.is_empty() {
        vec![1.0; args.inputs.len()]
    } else {
        args.weights.clone()
    };

    let mask = match &args.mask {
        Some(path) => Some(read_nifti_file(path)?),
        None => None,
    };

    let mut features = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let volume = read_nifti_file(path)?;
        let volume = match &mask {
            Some(label) => apply_mask(&volume, label)?,
            None => volume,
        };
        features.push(volume);
    }

    let policy = MaskPolicy::from_str(&args.mask_policy);
    let mut joint = fuse(&features, &weights, policy)?;

    if args.outlier_removal {
        info!("outlier removal requested");
        let binning = BinningRule::from_str(&args.binning);
        joint = remove_outliers(&joint, args.lower_cut, args.upper_cut, binning)?;
    }

    if args.transform_weighting {
        info!("transforming the joint information into a weighting map");
        joint = rescale_to_unit(&joint)?;
    }

    save_nifti_to_file(&args.output, &joint, true)?;
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
