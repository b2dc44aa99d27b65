//! Fixed-bin histogram with interpolated quantile queries.
//!
//! Built once over a masked subset of a volume's samples, queried for the
//! percentile bounds of the outlier-removal stage and for the quantile
//! tables of histogram matching, then discarded.

use crate::error::VolumeError;

/// Rule used to derive the bin count of a histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinningRule {
    /// `floor(sqrt(hi - lo))` bins, minimum 1. Empirical heuristic tied to
    /// the value range rather than the sample count; the default.
    SqrtRange,
    /// `ceil(log2(n)) + 1` bins over the n contributing samples
    Sturges,
}

impl BinningRule {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sturges" => BinningRule::Sturges,
            _ => BinningRule::SqrtRange,
        }
    }

    /// Number of bins for `n_samples` values spanning `[lo, hi]`
    pub fn bin_count(&self, n_samples: usize, lo: f64, hi: f64) -> usize {
        match self {
            BinningRule::SqrtRange => {
                let range = (hi - lo).max(0.0);
                (range.sqrt().floor() as usize).max(1)
            }
            BinningRule::Sturges => {
                if n_samples < 2 {
                    1
                } else {
                    (n_samples as f64).log2().ceil() as usize + 1
                }
            }
        }
    }
}

/// Equal-width histogram over a closed value range
#[derive(Debug)]
pub struct Histogram {
    lo: f64,
    hi: f64,
    counts: Vec<u64>,
    total: u64,
}

impl Histogram {
    /// Build a histogram over `values`, restricted to in-mask samples
    ///
    /// Only samples where `mask[i] > 0` contribute; with no mask every
    /// sample does. Samples are clamped into `[lo, hi]` before binning.
    ///
    /// # Errors
    /// `DegenerateRange` when `hi <= lo` or when no sample contributes.
    pub fn build(
        values: &[f64],
        mask: Option<&[u8]>,
        lo: f64,
        hi: f64,
        bins: usize,
    ) -> Result<Self, VolumeError> {
        if hi <= lo {
            return Err(VolumeError::DegenerateRange(format!(
                "histogram range [{}, {}] has no width", lo, hi
            )));
        }
        let bins = bins.max(1);
        let width = (hi - lo) / bins as f64;
        let mut counts = vec![0u64; bins];
        let mut total = 0u64;

        for (i, &v) in values.iter().enumerate() {
            if let Some(m) = mask {
                if m[i] == 0 {
                    continue;
                }
            }
            let bin = (((v - lo) / width).floor() as isize)
                .clamp(0, bins as isize - 1) as usize;
            counts[bin] += 1;
            total += 1;
        }

        if total == 0 {
            return Err(VolumeError::DegenerateRange(
                "no samples inside the histogram mask".to_string(),
            ));
        }

        Ok(Histogram { lo, hi, counts, total })
    }

    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.counts.len() as f64
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Value at which the cumulative histogram first reaches proportion `cut`
    ///
    /// Linear interpolation inside the containing bin; `cut` is clamped to
    /// [0, 1]. `quantile(0.0)` is the lower edge of the first occupied bin
    /// and `quantile(1.0)` the upper edge of the last.
    pub fn quantile(&self, cut: f64) -> f64 {
        let cut = cut.clamp(0.0, 1.0);
        let total = self.total as f64;
        let width = self.bin_width();

        let mut cumulated = 0u64;
        let mut prev_proportion = 0.0;
        for (i, &count) in self.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            cumulated += count;
            let proportion = cumulated as f64 / total;
            let bin_lo = self.lo + i as f64 * width;
            if proportion >= cut {
                let bin_proportion = count as f64 / total;
                return bin_lo + (cut - prev_proportion) / bin_proportion * width;
            }
            prev_proportion = proportion;
        }

        self.hi
    }
}
