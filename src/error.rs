//! Error taxonomy shared by both processing pipelines.
//!
//! Every failure is fatal to the invocation that produced it: no operation
//! is retried and no output file is written after an error.

use thiserror::Error;

/// Errors raised by volume I/O and the voxelwise pipelines
#[derive(Debug, Error)]
pub enum VolumeError {
    /// File could not be read, decoded, or written
    #[error("I/O failure: {0}")]
    Io(String),

    /// Grids that must align do not share dimensions or geometry
    #[error("geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// A value range collapsed to zero width where a spread is required
    #[error("degenerate value range: {0}")]
    DegenerateRange(String),

    /// The fusion engine was given no features
    #[error("empty feature set")]
    EmptyFeatureSet,

    /// A caller-supplied parameter is outside its valid domain
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// On-disk voxel storage type outside the supported scalar set
    #[error("unsupported voxel representation: {0}")]
    UnsupportedRepresentation(String),
}
