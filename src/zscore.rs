//! Voxelwise z-score mapping against population template statistics.
//!
//! Compares a subject volume to template mean and standard-deviation
//! volumes built from a healthy population, producing
//! `z = (subject - mean) / std` at every eligible voxel. Scores beyond a
//! stability band are discarded rather than clamped, keeping template
//! artifacts and numerically extreme voxels out of the map.

use log::info;

use crate::error::VolumeError;
use crate::histmatch::{match_histogram, DEFAULT_LEVELS, DEFAULT_MATCH_POINTS};
use crate::volume::Volume;

/// Options of the z-score engine
#[derive(Debug, Clone)]
pub struct ZScoreOptions {
    /// Match subject intensities to the template mean before scoring
    pub histogram_match: bool,
    /// Discretization levels used by histogram matching
    pub match_levels: usize,
    /// Quantile match points used by histogram matching
    pub match_points: usize,
    /// Scores at or beyond the open interval (-band, band) are discarded
    pub band: f64,
}

impl Default for ZScoreOptions {
    fn default() -> Self {
        ZScoreOptions {
            histogram_match: false,
            match_levels: DEFAULT_LEVELS,
            match_points: DEFAULT_MATCH_POINTS,
            band: 10.0,
        }
    }
}

/// Compute the z-score map of a subject against template statistics
///
/// The output starts as zero everywhere. A voxel is eligible when the
/// region mask is positive there, or, with no region mask supplied, when
/// the template mean is positive. Eligible voxels with a nonzero template
/// std get `z = (subject - mean) / std` written, but only while
/// `-band < z < band` holds; out-of-band scores leave the zero baseline in
/// place. Voxels with a zero template std stay at the baseline.
///
/// # Errors
/// `GeometryMismatch` when mean, std, or the region mask is not aligned
/// with the subject.
pub fn zscore_map(
    subject: &Volume,
    mean: &Volume,
    std: &Volume,
    region: Option<&Volume>,
    opts: &ZScoreOptions,
) -> Result<Volume, VolumeError> {
    subject.check_same_geometry(mean, "template mean")?;
    subject.check_same_geometry(std, "template std")?;
    if let Some(r) = region {
        subject.check_same_geometry(r, "region mask")?;
    }

    let matched;
    let samples: &[f64] = if opts.histogram_match {
        info!("matching subject intensities to the template mean");
        matched = match_histogram(subject, mean, opts.match_levels, opts.match_points)?;
        &matched.data
    } else {
        &subject.data
    };

    let region_mask: Option<Vec<u8>> = region.map(|r| r.to_mask());

    let mut out = subject.zeros_like();
    for v in 0..out.data.len() {
        let eligible = match &region_mask {
            Some(m) => m[v] > 0,
            None => mean.data[v] > 0.0,
        };
        if !eligible || std.data[v] == 0.0 {
            continue;
        }
        let z = (samples[v] - mean.data[v]) / std.data[v];
        if z > -opts.band && z < opts.band {
            out.data[v] = z;
        }
    }
    Ok(out)
}
