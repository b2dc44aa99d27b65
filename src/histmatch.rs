//! Histogram matching between scalar volumes.
//!
//! Quantile-mapping intensity normalization: both images are summarized by
//! quantile tables sampled at evenly spaced cumulative proportions, and
//! source intensities are mapped to the reference through the resulting
//! piecewise-linear transfer function. Samples at or below the image mean
//! are excluded from table construction so the background does not dominate
//! the mapping. The defaults of 255 discretization levels and 64 match
//! points follow the z-score tooling this normalization serves.

use log::debug;

use crate::error::VolumeError;
use crate::histogram::Histogram;
use crate::volume::Volume;

/// Default number of histogram discretization levels
pub const DEFAULT_LEVELS: usize = 255;
/// Default number of interior quantile match points
pub const DEFAULT_MATCH_POINTS: usize = 64;

/// Map the intensity distribution of `source` onto that of `reference`
///
/// The output carries the geometry of `source`; the two volumes need not be
/// aligned, only their intensity statistics interact. Source samples below
/// the first table entry map to the reference table's first entry, and
/// symmetrically at the top.
///
/// # Errors
/// `DegenerateRange` when either volume has no spread above its mean
/// intensity.
pub fn match_histogram(
    source: &Volume,
    reference: &Volume,
    levels: usize,
    match_points: usize,
) -> Result<Volume, VolumeError> {
    let src_table = quantile_table(&source.data, levels, match_points)?;
    let ref_table = quantile_table(&reference.data, levels, match_points)?;
    debug!(
        "histogram matching over [{:.4}, {:.4}] -> [{:.4}, {:.4}]",
        src_table[0],
        src_table[src_table.len() - 1],
        ref_table[0],
        ref_table[ref_table.len() - 1]
    );

    let mut out = source.clone();
    for v in out.data.iter_mut() {
        *v = map_intensity(*v, &src_table, &ref_table);
    }
    Ok(out)
}

/// Quantile table of the above-mean samples at `match_points + 2` evenly
/// spaced cumulative proportions (endpoints included)
fn quantile_table(
    values: &[f64],
    levels: usize,
    match_points: usize,
) -> Result<Vec<f64>, VolumeError> {
    if values.is_empty() {
        return Err(VolumeError::DegenerateRange(
            "cannot match an empty volume".to_string(),
        ));
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let mut mask = vec![0u8; values.len()];
    for (i, &v) in values.iter().enumerate() {
        if v > mean {
            mask[i] = 1;
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
    }

    if lo >= hi {
        return Err(VolumeError::DegenerateRange(
            "no intensity spread above the mean".to_string(),
        ));
    }

    let hist = Histogram::build(values, Some(&mask), lo, hi, levels.max(1))?;
    let n_points = match_points + 2;
    let table = (0..n_points)
        .map(|k| hist.quantile(k as f64 / (n_points - 1) as f64))
        .collect();
    Ok(table)
}

/// Piecewise-linear transfer through matching quantile tables, clamped at
/// the table ends
fn map_intensity(x: f64, src: &[f64], dst: &[f64]) -> f64 {
    let last = src.len() - 1;
    if x <= src[0] {
        return dst[0];
    }
    if x >= src[last] {
        return dst[last];
    }

    let mut j = 0;
    while j + 1 < last && x > src[j + 1] {
        j += 1;
    }
    let span = src[j + 1] - src[j];
    if span <= 0.0 {
        return dst[j];
    }
    dst[j] + (x - src[j]) / span * (dst[j + 1] - dst[j])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_volume(lo: f64, hi: f64, n: usize) -> Volume {
        let step = (hi - lo) / (n - 1) as f64;
        let data: Vec<f64> = (0..n).map(|i| lo + i as f64 * step).collect();
        Volume::from_data(data, (n, 1, 1))
    }

    #[test]
    fn test_geometry_preserved() {
        let src = ramp_volume(0.0, 10.0, 512);
        let reference = ramp_volume(100.0, 200.0, 729);
        let out = match_histogram(&src, &reference, 64, 8).unwrap();
        assert!(out.same_geometry(&src));
        assert_eq!(out.data.len(), src.data.len());
    }

    #[test]
    fn test_distribution_moves_toward_reference() {
        let src = ramp_volume(0.0, 10.0, 1000);
        let reference = ramp_volume(100.0, 200.0, 1000);
        let out = match_histogram(&src, &reference, 255, 64).unwrap();

        // The matched range must land on the reference's above-mean range
        let out_min = out.data.iter().cloned().fold(f64::INFINITY, f64::min);
        let out_max = out.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(
            (out_max - 200.0).abs() < 1.0,
            "matched maximum {} should reach the reference maximum", out_max
        );
        assert!(
            (out_min - 150.0).abs() < 2.0,
            "matched minimum {} should sit at the reference mean", out_min
        );
    }

    #[test]
    fn test_mapping_is_monotone() {
        let src = ramp_volume(0.0, 50.0, 500);
        let reference = ramp_volume(-5.0, 5.0, 500);
        let out = match_histogram(&src, &reference, 128, 16).unwrap();
        for w in out.data.windows(2) {
            assert!(w[1] >= w[0] - 1e-9, "mapping must preserve ordering");
        }
    }

    #[test]
    fn test_constant_volume_rejected() {
        let src = Volume::from_data(vec![3.0; 64], (4, 4, 4));
        let reference = ramp_volume(0.0, 1.0, 64);
        assert!(matches!(
            match_histogram(&src, &reference, 255, 64),
            Err(VolumeError::DegenerateRange(_))
        ));
    }

    #[test]
    fn test_map_intensity_clamps_at_ends() {
        let src = vec![1.0, 2.0, 3.0];
        let dst = vec![10.0, 20.0, 30.0];
        assert_eq!(map_intensity(0.0, &src, &dst), 10.0);
        assert_eq!(map_intensity(9.0, &src, &dst), 30.0);
        assert!((map_intensity(1.5, &src, &dst) - 15.0).abs() < 1e-12);
    }
}
