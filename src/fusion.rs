//! Weighted voxelwise fusion of aligned feature volumes.
//!
//! The fused map is the weighted arithmetic mean of the feature values at
//! each voxel. Weights are per-feature scalars; the weight sum is computed
//! once since it does not vary across voxels.

use crate::error::VolumeError;
use crate::volume::Volume;

/// How fusion treats zero-valued feature samples
///
/// Feature maps are commonly masked upstream, which writes zeros outside the
/// mask. With `IncludeZeroed` those zeros still count against the full
/// weight sum, diluting the average wherever some features are zero and
/// others are not. `ExcludeMasked` drops zero samples from both numerator
/// and denominator, so the surviving features average undiluted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskPolicy {
    /// Zero samples keep their weight in the denominator (compatibility
    /// behavior, default)
    IncludeZeroed,
    /// Zero samples are treated as missing and excluded per voxel
    ExcludeMasked,
}

impl MaskPolicy {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "exclude-masked" | "exclude_masked" | "exclude" => MaskPolicy::ExcludeMasked,
            _ => MaskPolicy::IncludeZeroed,
        }
    }
}

/// Fuse aligned feature volumes into a single joint map
///
/// `output[v] = sum_i(weight_i * feature_i[v]) / sum_i(weight_i)` under
/// `MaskPolicy::IncludeZeroed`; under `ExcludeMasked` both sums skip
/// features whose sample at `v` is exactly zero, and a voxel where every
/// feature is zero yields zero. The output carries the geometry of the
/// first feature.
///
/// # Errors
/// * `EmptyFeatureSet` with zero features
/// * `InvalidParameter` when the weight count does not match the feature
///   count, a weight is negative or non-finite, or the weights sum to zero
/// * `GeometryMismatch` when any feature is not aligned with the first
pub fn fuse(
    features: &[Volume],
    weights: &[f64],
    policy: MaskPolicy,
) -> Result<Volume, VolumeError> {
    if features.is_empty() {
        return Err(VolumeError::EmptyFeatureSet);
    }
    if weights.len() != features.len() {
        return Err(VolumeError::InvalidParameter(format!(
            "{} weights supplied for {} features",
            weights.len(),
            features.len()
        )));
    }
    if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(VolumeError::InvalidParameter(format!(
            "feature weight {} is not a non-negative finite number", w
        )));
    }
    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return Err(VolumeError::InvalidParameter(
            "feature weights sum to zero".to_string(),
        ));
    }
    let first = &features[0];
    for (i, f) in features.iter().enumerate().skip(1) {
        first.check_same_geometry(f, &format!("feature {}", i + 1))?;
    }

    let mut out = first.zeros_like();
    match policy {
        MaskPolicy::IncludeZeroed => {
            for v in 0..out.data.len() {
                let mut joint = 0.0;
                for (f, &w) in features.iter().zip(weights) {
                    joint += f.data[v] * w;
                }
                out.data[v] = joint / weight_sum;
            }
        }
        MaskPolicy::ExcludeMasked => {
            for v in 0..out.data.len() {
                let mut joint = 0.0;
                let mut denom = 0.0;
                for (f, &w) in features.iter().zip(weights) {
                    if f.data[v] != 0.0 {
                        joint += f.data[v] * w;
                        denom += w;
                    }
                }
                out.data[v] = if denom > 0.0 { joint / denom } else { 0.0 };
            }
        }
    }
    Ok(out)
}
