//! Label-mask application for scalar volumes.

use crate::error::VolumeError;
use crate::volume::Volume;

/// Zero out every voxel falling outside the label mask
///
/// The output keeps the input sample wherever the label is positive and is
/// zero elsewhere. Pure; the input volume is untouched.
///
/// # Errors
/// `GeometryMismatch` when the label grid is not aligned with the volume.
pub fn apply_mask(volume: &Volume, label: &Volume) -> Result<Volume, VolumeError> {
    volume.check_same_geometry(label, "label mask")?;

    let mut out = volume.zeros_like();
    for i in 0..volume.data.len() {
        if label.data[i] > 0.0 {
            out.data[i] = volume.data[i];
        }
    }
    Ok(out)
}

/// Binary mask of samples inside the closed interval `[lower, upper]`
///
/// Used to build the validity mask of the outlier-removal stage, where
/// `[1, f64::MAX]` excludes the exact-zero background from statistics.
pub fn threshold_mask(volume: &Volume, lower: f64, upper: f64) -> Vec<u8> {
    volume
        .data
        .iter()
        .map(|&v| u8::from(v >= lower && v <= upper))
        .collect()
}
