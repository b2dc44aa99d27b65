//! 3D scalar volume data model.
//!
//! Volumes are flat `Vec<f64>` buffers in Fortran (column-major) ordering to
//! match the NIfTI convention: `index = x + y*nx + z*nx*ny`. The geometry
//! descriptor (voxel sizes and 4x4 affine) travels with the samples so that
//! any operation combining several volumes can verify that they are aligned
//! before touching a single voxel.

use crate::error::VolumeError;

/// Identity affine, used for synthetic volumes and as a reader fallback
pub const IDENTITY_AFFINE: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

/// Comparison tolerance for voxel sizes and affine entries.
/// Both are stored as f32 on disk, so exact equality is too strict.
const GEOMETRY_TOL: f64 = 1e-4;

/// A 3D scalar volume with its geometry descriptor
///
/// All computation happens in f64 regardless of the on-disk storage type;
/// conversion to and from narrower representations is confined to the I/O
/// boundary.
#[derive(Debug, Clone)]
pub struct Volume {
    /// Samples in Fortran order (x varies fastest)
    pub data: Vec<f64>,
    /// Dimensions (nx, ny, nz)
    pub dims: (usize, usize, usize),
    /// Voxel sizes in mm
    pub voxel_size: (f64, f64, f64),
    /// Affine transformation matrix (4x4, row-major)
    pub affine: [f64; 16],
}

impl Volume {
    /// Create a volume from raw parts
    ///
    /// The data length must equal `nx * ny * nz`.
    pub fn new(
        data: Vec<f64>,
        dims: (usize, usize, usize),
        voxel_size: (f64, f64, f64),
        affine: [f64; 16],
    ) -> Self {
        debug_assert_eq!(data.len(), dims.0 * dims.1 * dims.2);
        Volume { data, dims, voxel_size, affine }
    }

    /// Synthetic volume with unit voxels and identity affine
    pub fn from_data(data: Vec<f64>, dims: (usize, usize, usize)) -> Self {
        Volume::new(data, dims, (1.0, 1.0, 1.0), IDENTITY_AFFINE)
    }

    /// Zero-filled volume sharing this volume's geometry
    pub fn zeros_like(&self) -> Self {
        Volume {
            data: vec![0.0; self.data.len()],
            dims: self.dims,
            voxel_size: self.voxel_size,
            affine: self.affine,
        }
    }

    /// Total number of voxels
    pub fn n_voxels(&self) -> usize {
        self.data.len()
    }

    /// True when `other` shares this volume's dimensions and geometry
    pub fn same_geometry(&self, other: &Volume) -> bool {
        if self.dims != other.dims {
            return false;
        }
        let (ax, ay, az) = self.voxel_size;
        let (bx, by, bz) = other.voxel_size;
        if (ax - bx).abs() > GEOMETRY_TOL
            || (ay - by).abs() > GEOMETRY_TOL
            || (az - bz).abs() > GEOMETRY_TOL
        {
            return false;
        }
        self.affine
            .iter()
            .zip(other.affine.iter())
            .all(|(a, b)| (a - b).abs() <= GEOMETRY_TOL)
    }

    /// Error out unless `other` is aligned with this volume
    ///
    /// `what` names the offending input in the error message.
    pub fn check_same_geometry(&self, other: &Volume, what: &str) -> Result<(), VolumeError> {
        if self.same_geometry(other) {
            Ok(())
        } else {
            Err(VolumeError::GeometryMismatch(format!(
                "{} is {}x{}x{}, expected {}x{}x{} with matching geometry",
                what,
                other.dims.0, other.dims.1, other.dims.2,
                self.dims.0, self.dims.1, self.dims.2,
            )))
        }
    }

    /// Minimum and maximum over all samples
    pub fn min_max(&self) -> (f64, f64) {
        let min = self.data.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = self.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    }

    /// Binary mask view of a label volume: sample > 0 means inside
    pub fn to_mask(&self) -> Vec<u8> {
        self.data.iter().map(|&v| u8::from(v > 0.0)).collect()
    }
}
