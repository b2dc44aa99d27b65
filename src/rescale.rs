//! Rescaling of strictly positive voxels into the unit interval.

use crate::error::VolumeError;
use crate::volume::Volume;

/// Linearly map the positive samples of a volume onto [0, 1]
///
/// The range is computed over samples strictly greater than zero, so the
/// background does not stretch the mapping. Positive samples become
/// `(v - min) / (max - min)`; zero and negative samples pass through
/// unchanged. The global positive maximum maps to exactly 1.0 and the
/// global positive minimum to exactly 0.0.
///
/// # Errors
/// `DegenerateRange` when there are no positive samples or all positive
/// samples share one value.
pub fn rescale_to_unit(volume: &Volume) -> Result<Volume, VolumeError> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in &volume.data {
        if v > 0.0 {
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
    }

    if min > max {
        return Err(VolumeError::DegenerateRange(
            "no positive samples to rescale".to_string(),
        ));
    }
    if max == min {
        return Err(VolumeError::DegenerateRange(format!(
            "all positive samples equal {}", min
        )));
    }

    let range = max - min;
    let mut out = volume.clone();
    for v in out.data.iter_mut() {
        if *v > 0.0 {
            *v = (*v - min) / range;
        }
    }
    Ok(out)
}
