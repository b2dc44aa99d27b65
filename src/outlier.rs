//! Percentile-based outlier removal for fused feature maps.

use log::info;

use crate::error::VolumeError;
use crate::histogram::{BinningRule, Histogram};
use crate::mask::threshold_mask;
use crate::volume::Volume;

/// Zero out voxels whose values fall outside histogram-derived percentile
/// bounds
///
/// A histogram is built over the samples inside `[1, f64::MAX]` (exact-zero
/// background is excluded from the statistics) covering the full value range
/// of the volume, and the bounds are its quantiles at `lower_cut` and
/// `upper_cut`. Samples outside the closed bound interval are replaced by
/// zero; this is a discard-to-background policy, values are never clipped
/// to the nearest bound.
///
/// # Errors
/// * `InvalidParameter` when the cuts are outside [0, 1] or out of order
/// * `DegenerateRange` on a constant-valued volume or when no sample
///   reaches the validity threshold
pub fn remove_outliers(
    volume: &Volume,
    lower_cut: f64,
    upper_cut: f64,
    binning: BinningRule,
) -> Result<Volume, VolumeError> {
    if !(0.0..=1.0).contains(&lower_cut) || !(0.0..=1.0).contains(&upper_cut) {
        return Err(VolumeError::InvalidParameter(format!(
            "percentile cuts must be fractions in [0, 1], got {} and {}",
            lower_cut, upper_cut
        )));
    }
    if lower_cut > upper_cut {
        return Err(VolumeError::InvalidParameter(format!(
            "lower cut {} exceeds upper cut {}", lower_cut, upper_cut
        )));
    }

    let (min, max) = volume.min_max();
    if max <= min {
        return Err(VolumeError::DegenerateRange(format!(
            "fused map is constant at {}", min
        )));
    }

    let valid = threshold_mask(volume, 1.0, f64::MAX);
    let n_valid = valid.iter().filter(|&&m| m > 0).count();
    let bins = binning.bin_count(n_valid, min, max);
    let hist = Histogram::build(&volume.data, Some(&valid), min, max, bins)?;

    let lower_bound = hist.quantile(lower_cut);
    let upper_bound = hist.quantile(upper_cut);
    info!(
        "outlier bounds [{:.6}, {:.6}] from {} bins over {} samples",
        lower_bound, upper_bound, bins, n_valid
    );

    let mut out = volume.zeros_like();
    for (o, &v) in out.data.iter_mut().zip(volume.data.iter()) {
        if v >= lower_bound && v <= upper_bound {
            *o = v;
        }
    }
    Ok(out)
}
