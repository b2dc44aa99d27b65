//! featmap: fusion and z-score mapping of co-registered 3D feature maps
//!
//! This crate fuses multiple aligned scalar volumes into a single joint
//! information map, optionally removes statistical outliers using
//! histogram-derived percentile bounds and rescales the result into a [0,1]
//! weighting map, and computes voxelwise z-score maps of a subject volume
//! against population template statistics.
//!
//! # Modules
//! - `volume`: 3D scalar volume data model with geometry
//! - `nifti_io`: NIfTI-1 reading and writing
//! - `mask`: label-mask application and binary thresholding
//! - `fusion`: weighted voxelwise combination of feature volumes
//! - `histogram`: fixed-bin histograms with quantile queries
//! - `outlier`: percentile-based outlier removal
//! - `rescale`: unit-interval rescaling of positive voxels
//! - `histmatch`: quantile-mapping intensity normalization
//! - `zscore`: z-score mapping against template mean/std volumes

pub mod error;
pub mod volume;

pub mod nifti_io;

pub mod fusion;
pub mod histmatch;
pub mod histogram;
pub mod mask;
pub mod outlier;
pub mod rescale;
pub mod zscore;

pub use error::VolumeError;
pub use volume::Volume;
