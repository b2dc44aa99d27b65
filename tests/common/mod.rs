//! Common test utilities for featmap integration tests

use std::path::PathBuf;

use featmap::Volume;

/// Linear ramp volume over [lo, hi]
pub fn ramp_volume(lo: f64, hi: f64, dims: (usize, usize, usize)) -> Volume {
    let n = dims.0 * dims.1 * dims.2;
    let step = (hi - lo) / (n - 1) as f64;
    let data: Vec<f64> = (0..n).map(|i| lo + i as f64 * step).collect();
    Volume::from_data(data, dims)
}

/// Constant-valued volume
pub fn constant_volume(value: f64, dims: (usize, usize, usize)) -> Volume {
    let n = dims.0 * dims.1 * dims.2;
    Volume::from_data(vec![value; n], dims)
}

/// Unique temp path for a test output file
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("featmap_it_{}_{}", std::process::id(), name))
}
