//! NIfTI file I/O.
//!
//! Reads and writes 3D scalar volumes as NIfTI-1 files (.nii and .nii.gz,
//! gzip auto-detected on read). All supported on-disk scalar types are
//! converted to f64 at this boundary; outputs are written as FLOAT32,
//! optionally gzip-compressed.

use std::io::Cursor;
use std::path::Path;

use flate2::read::GzDecoder;
use ndarray::Array;
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiHeader, NiftiObject};

use crate::error::VolumeError;
use crate::volume::Volume;

/// Check if bytes are gzip compressed
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Get header info for diagnostics
fn get_header_info(bytes: &[u8]) -> String {
    if bytes.len() < 348 {
        return format!("File too small ({} bytes, need at least 348)", bytes.len());
    }

    // NIfTI-1 header size should be at offset 0, stored as i32
    let sizeof_hdr = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

    // Magic bytes at offset 344 for NIfTI-1
    let magic = String::from_utf8_lossy(&bytes[344..348]).to_string();

    // Data type at offset 70
    let datatype = i16::from_le_bytes([bytes[70], bytes[71]]);

    format!("sizeof_hdr={}, magic='{}', datatype={}", sizeof_hdr, magic, datatype)
}

/// Human-readable name of a NIfTI datatype code
fn datatype_name(code: i16) -> String {
    match code {
        2 => "UINT8".to_string(),
        4 => "INT16".to_string(),
        8 => "INT32".to_string(),
        16 => "FLOAT32".to_string(),
        32 => "COMPLEX64".to_string(),
        64 => "FLOAT64".to_string(),
        128 => "RGB24".to_string(),
        256 => "INT8".to_string(),
        512 => "UINT16".to_string(),
        768 => "UINT32".to_string(),
        1024 => "INT64".to_string(),
        1280 => "UINT64".to_string(),
        1536 => "FLOAT128".to_string(),
        1792 => "COMPLEX128".to_string(),
        2304 => "RGBA32".to_string(),
        other => format!("datatype code {}", other),
    }
}

/// Scalar storage types this pipeline accepts on disk
const SUPPORTED_DATATYPES: [i16; 10] = [2, 4, 8, 16, 64, 256, 512, 768, 1024, 1280];

/// Load a volume from NIfTI bytes
///
/// Supports both .nii and .nii.gz content (gzip is auto-detected). 4D
/// inputs are reduced to their first timepoint.
pub fn load_nifti(bytes: &[u8]) -> Result<Volume, VolumeError> {
    let obj: InMemNiftiObject = if is_gzip(bytes) {
        let cursor = Cursor::new(bytes);
        let decoder = GzDecoder::new(cursor);
        InMemNiftiObject::from_reader(decoder).map_err(|e| {
            // Try to get header info from decompressed data
            let mut decoder2 = GzDecoder::new(Cursor::new(bytes));
            let mut decompressed = Vec::new();
            let info = if std::io::Read::read_to_end(&mut decoder2, &mut decompressed).is_ok() {
                get_header_info(&decompressed)
            } else {
                "Could not decompress".to_string()
            };
            VolumeError::Io(format!("Failed to read gzipped NIfTI: {} ({})", e, info))
        })?
    } else {
        let info = get_header_info(bytes);
        let cursor = Cursor::new(bytes);
        InMemNiftiObject::from_reader(cursor)
            .map_err(|e| VolumeError::Io(format!("Failed to read NIfTI: {} ({})", e, info)))?
    };

    let header = obj.header();

    let ndim = header.dim[0] as usize;
    if ndim < 3 {
        return Err(VolumeError::Io(format!(
            "Expected at least 3D volume, got {}D", ndim
        )));
    }

    if !SUPPORTED_DATATYPES.contains(&header.datatype) {
        return Err(VolumeError::UnsupportedRepresentation(datatype_name(
            header.datatype,
        )));
    }

    let pixdim = header.pixdim;
    let voxel_size = (pixdim[1] as f64, pixdim[2] as f64, pixdim[3] as f64);
    let affine = get_affine(header);

    // Convert volume to ndarray; scl_slope/scl_inter are applied here
    let volume = obj.into_volume();
    let array: Array<f64, _> = volume
        .into_ndarray()
        .map_err(|e| VolumeError::Io(format!("Failed to convert to ndarray: {}", e)))?;

    let shape = array.shape();
    if shape.len() < 3 || shape.len() > 4 {
        return Err(VolumeError::Io(format!(
            "Expected a 3D or 4D array, got {}D", shape.len()
        )));
    }

    // Use the actual array shape for dimensions (nifti-rs may reorder)
    let (nx, ny, nz) = (shape[0], shape[1], shape[2]);

    // Extract data in Fortran order (x varies fastest) to match NIfTI
    // convention: index = x + y*nx + z*nx*ny. 4D arrays contribute their
    // first timepoint only.
    let mut data = Vec::with_capacity(nx * ny * nz);
    if shape.len() == 3 {
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    data.push(array[[i, j, k]]);
                }
            }
        }
    } else {
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    data.push(array[[i, j, k, 0]]);
                }
            }
        }
    }

    Ok(Volume::new(data, (nx, ny, nz), voxel_size, affine))
}

/// Get affine transformation matrix from header
fn get_affine(header: &NiftiHeader) -> [f64; 16] {
    // Prefer sform if available (sform_code > 0)
    if header.sform_code > 0 {
        let s = &header.srow_x;
        let t = &header.srow_y;
        let u = &header.srow_z;
        [
            s[0] as f64, s[1] as f64, s[2] as f64, s[3] as f64,
            t[0] as f64, t[1] as f64, t[2] as f64, t[3] as f64,
            u[0] as f64, u[1] as f64, u[2] as f64, u[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        ]
    } else {
        // Fall back to identity with voxel scaling
        let vsx = header.pixdim[1] as f64;
        let vsy = header.pixdim[2] as f64;
        let vsz = header.pixdim[3] as f64;
        [
            vsx, 0.0, 0.0, 0.0,
            0.0, vsy, 0.0, 0.0,
            0.0, 0.0, vsz, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}

/// Serialize a volume as uncompressed NIfTI-1 bytes (FLOAT32 on disk)
pub fn save_nifti(volume: &Volume) -> Result<Vec<u8>, VolumeError> {
    use std::io::Write;

    let (nx, ny, nz) = volume.dims;
    let (vsx, vsy, vsz) = volume.voxel_size;
    let affine = &volume.affine;

    // Create NIfTI-1 header (348 bytes)
    let mut header = [0u8; 348];

    // sizeof_hdr = 348
    header[0..4].copy_from_slice(&348i32.to_le_bytes());

    // dim[0..7]
    let dim: [i16; 8] = [3, nx as i16, ny as i16, nz as i16, 1, 1, 1, 1];
    for (i, &d) in dim.iter().enumerate() {
        let offset = 40 + i * 2;
        header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
    }

    // datatype = 16 (FLOAT32)
    header[70..72].copy_from_slice(&16i16.to_le_bytes());

    // bitpix = 32
    header[72..74].copy_from_slice(&32i16.to_le_bytes());

    // pixdim[0..7]
    let pixdim: [f32; 8] = [1.0, vsx as f32, vsy as f32, vsz as f32, 1.0, 1.0, 1.0, 1.0];
    for (i, &p) in pixdim.iter().enumerate() {
        let offset = 76 + i * 4;
        header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
    }

    // vox_offset = 352 (header + 4 bytes extension)
    header[108..112].copy_from_slice(&352.0f32.to_le_bytes());

    // scl_slope = 1.0
    header[112..116].copy_from_slice(&1.0f32.to_le_bytes());

    // scl_inter = 0.0
    header[116..120].copy_from_slice(&0.0f32.to_le_bytes());

    // sform_code = 1 (scanner anat)
    header[254..256].copy_from_slice(&1i16.to_le_bytes());

    // srow_x, srow_y, srow_z
    for i in 0..4 {
        let offset = 280 + i * 4;
        header[offset..offset + 4].copy_from_slice(&(affine[i] as f32).to_le_bytes());
    }
    for i in 0..4 {
        let offset = 296 + i * 4;
        header[offset..offset + 4].copy_from_slice(&(affine[4 + i] as f32).to_le_bytes());
    }
    for i in 0..4 {
        let offset = 312 + i * 4;
        header[offset..offset + 4].copy_from_slice(&(affine[8 + i] as f32).to_le_bytes());
    }

    // magic = "n+1\0" for NIfTI-1 single file
    header[344..348].copy_from_slice(b"n+1\0");

    // Build output buffer
    let mut buffer = Vec::with_capacity(352 + volume.data.len() * 4);

    buffer
        .write_all(&header)
        .map_err(|e| VolumeError::Io(format!("Write header failed: {}", e)))?;

    // Extension indicator (4 bytes, all zeros = no extension)
    buffer
        .write_all(&[0u8; 4])
        .map_err(|e| VolumeError::Io(format!("Write extension failed: {}", e)))?;

    // Data as float32
    for &val in &volume.data {
        buffer
            .write_all(&(val as f32).to_le_bytes())
            .map_err(|e| VolumeError::Io(format!("Write data failed: {}", e)))?;
    }

    Ok(buffer)
}

/// Serialize a volume as gzipped NIfTI-1 bytes (.nii.gz)
pub fn save_nifti_gz(volume: &Volume) -> Result<Vec<u8>, VolumeError> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let uncompressed = save_nifti(volume)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&uncompressed)
        .map_err(|e| VolumeError::Io(format!("Gzip compression failed: {}", e)))?;

    encoder
        .finish()
        .map_err(|e| VolumeError::Io(format!("Gzip finish failed: {}", e)))
}

/// Read a volume from a filesystem path
///
/// Supports both .nii and .nii.gz files.
pub fn read_nifti_file(path: &Path) -> Result<Volume, VolumeError> {
    let bytes = std::fs::read(path)
        .map_err(|e| VolumeError::Io(format!("Failed to read file '{}': {}", path.display(), e)))?;
    load_nifti(&bytes)
}

/// Save a volume to a file
///
/// Written gzip-compressed when `compress` is set or the path ends with
/// .nii.gz; uncompressed .nii otherwise.
pub fn save_nifti_to_file(path: &Path, volume: &Volume, compress: bool) -> Result<(), VolumeError> {
    let gz = compress || path.to_string_lossy().ends_with(".nii.gz");
    let bytes = if gz {
        save_nifti_gz(volume)?
    } else {
        save_nifti(volume)?
    };

    std::fs::write(path, &bytes)
        .map_err(|e| VolumeError::Io(format!("Failed to write file '{}': {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::IDENTITY_AFFINE;

    #[test]
    fn test_gzip_detection() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x00]));
        assert!(!is_gzip(&[0x00, 0x00, 0x00]));
        assert!(!is_gzip(&[0x1f])); // Too short
    }

    #[test]
    fn test_affine_identity() {
        let mut header = NiftiHeader::default();
        header.pixdim[1] = 1.0;
        header.pixdim[2] = 2.0;
        header.pixdim[3] = 3.0;
        header.sform_code = 0;

        let affine = get_affine(&header);
        assert_eq!(affine[0], 1.0);
        assert_eq!(affine[5], 2.0);
        assert_eq!(affine[10], 3.0);
    }

    #[test]
    fn test_affine_sform() {
        let mut header = NiftiHeader::default();
        header.sform_code = 1;
        header.srow_x = [1.0, 0.0, 0.0, 10.0];
        header.srow_y = [0.0, 2.0, 0.0, 20.0];
        header.srow_z = [0.0, 0.0, 3.0, 30.0];

        let affine = get_affine(&header);
        assert_eq!(affine[0], 1.0);
        assert_eq!(affine[3], 10.0);
        assert_eq!(affine[5], 2.0);
        assert_eq!(affine[7], 20.0);
        assert_eq!(affine[10], 3.0);
        assert_eq!(affine[11], 30.0);
        assert_eq!(affine[15], 1.0);
    }

    #[test]
    fn test_save_nifti_header() {
        let volume = Volume::from_data(vec![0.0; 8], (2, 2, 2));
        let bytes = save_nifti(&volume).unwrap();

        // Header size + extension + data
        assert_eq!(bytes.len(), 352 + 8 * 4);

        // Magic
        assert_eq!(&bytes[344..348], b"n+1\0");

        // sizeof_hdr
        let sizeof_hdr = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(sizeof_hdr, 348);

        // datatype = 16 (FLOAT32), bitpix = 32
        assert_eq!(i16::from_le_bytes([bytes[70], bytes[71]]), 16);
        assert_eq!(i16::from_le_bytes([bytes[72], bytes[73]]), 32);
    }

    #[test]
    fn test_save_and_read_roundtrip() {
        let dims = (4, 4, 4);
        let n = dims.0 * dims.1 * dims.2;
        let affine = [
            1.0, 0.0, 0.0, 10.0,
            0.0, 2.0, 0.0, 20.0,
            0.0, 0.0, 3.0, 30.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        let data: Vec<f64> = (0..n).map(|i| (i as f64) * 0.5 + 1.0).collect();
        let volume = Volume::new(data.clone(), dims, (1.0, 2.0, 3.0), affine);

        let tmp_path = std::env::temp_dir().join("featmap_roundtrip_test.nii");
        save_nifti_to_file(&tmp_path, &volume, false).unwrap();
        let loaded = read_nifti_file(&tmp_path).unwrap();

        assert_eq!(loaded.dims, dims);
        assert!((loaded.voxel_size.0 - 1.0).abs() < 1e-5);
        assert!((loaded.voxel_size.1 - 2.0).abs() < 1e-5);
        assert!((loaded.voxel_size.2 - 3.0).abs() < 1e-5);

        // Saved as f32, so some precision loss expected
        assert_eq!(loaded.data.len(), n);
        for i in 0..n {
            assert!(
                (loaded.data[i] - data[i]).abs() < 0.01,
                "Data mismatch at index {}: expected {}, got {}",
                i, data[i], loaded.data[i]
            );
        }

        // Affine preserved at f32 precision
        for i in 0..16 {
            assert!(
                (loaded.affine[i] - affine[i]).abs() < 0.01,
                "Affine[{}] mismatch: expected {}, got {}",
                i, affine[i], loaded.affine[i]
            );
        }

        std::fs::remove_file(&tmp_path).ok();
    }

    #[test]
    fn test_save_compressed_roundtrip() {
        let dims = (4, 4, 4);
        let n = dims.0 * dims.1 * dims.2;
        let data: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let volume = Volume::from_data(data.clone(), dims);

        let tmp_path = std::env::temp_dir().join("featmap_gz_test.nii.gz");
        save_nifti_to_file(&tmp_path, &volume, true).unwrap();

        // The file must actually be gzip compressed
        let bytes = std::fs::read(&tmp_path).unwrap();
        assert!(is_gzip(&bytes), "File should be gzip compressed");

        let loaded = read_nifti_file(&tmp_path).unwrap();
        assert_eq!(loaded.dims, dims);
        for i in 0..n {
            assert!((loaded.data[i] - data[i]).abs() < 0.01);
        }

        std::fs::remove_file(&tmp_path).ok();
    }

    #[test]
    fn test_compress_flag_without_gz_extension() {
        let volume = Volume::from_data(vec![1.0; 8], (2, 2, 2));
        let tmp_path = std::env::temp_dir().join("featmap_forced_gz_test.nii");
        save_nifti_to_file(&tmp_path, &volume, true).unwrap();

        let bytes = std::fs::read(&tmp_path).unwrap();
        assert!(is_gzip(&bytes), "compress flag should force gzip output");
        // gzip is auto-detected regardless of extension
        let loaded = read_nifti_file(&tmp_path).unwrap();
        assert_eq!(loaded.dims, (2, 2, 2));

        std::fs::remove_file(&tmp_path).ok();
    }

    #[test]
    fn test_load_invalid_bytes() {
        assert!(matches!(load_nifti(&[0u8; 10]), Err(VolumeError::Io(_))));
    }

    #[test]
    fn test_load_invalid_gzip() {
        assert!(matches!(
            load_nifti(&[0x1f, 0x8b, 0x00, 0x00, 0x00]),
            Err(VolumeError::Io(_))
        ));
    }

    #[test]
    fn test_unsupported_datatype_rejected() {
        // Valid 3D header with datatype 128 (RGB24)
        let volume = Volume::from_data(vec![0.0; 8], (2, 2, 2));
        let mut bytes = save_nifti(&volume).unwrap();
        bytes[70..72].copy_from_slice(&128i16.to_le_bytes());

        match load_nifti(&bytes) {
            Err(VolumeError::UnsupportedRepresentation(name)) => {
                assert!(name.contains("RGB24"), "should name the type: {}", name);
            }
            other => panic!("expected UnsupportedRepresentation, got {:?}", other),
        }
    }

    #[test]
    fn test_read_nonexistent_file() {
        let result = read_nifti_file(Path::new("/tmp/featmap_missing_12345.nii"));
        match result {
            Err(VolumeError::Io(msg)) => {
                assert!(msg.contains("Failed to read file"), "unexpected message: {}", msg);
            }
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_get_header_info() {
        let info = get_header_info(&[0u8; 10]);
        assert!(info.contains("too small"));

        let mut bytes = vec![0u8; 348];
        bytes[0..4].copy_from_slice(&348i32.to_le_bytes());
        bytes[344..348].copy_from_slice(b"n+1\0");
        bytes[70..72].copy_from_slice(&16i16.to_le_bytes());
        let info = get_header_info(&bytes);
        assert!(info.contains("sizeof_hdr=348"));
        assert!(info.contains("datatype=16"));
    }

    #[test]
    fn test_geometry_default() {
        let volume = Volume::new(vec![0.0; 8], (2, 2, 2), (1.0, 1.0, 1.0), IDENTITY_AFFINE);
        let bytes = save_nifti(&volume).unwrap();
        let loaded = load_nifti(&bytes).unwrap();
        assert!(loaded.same_geometry(&volume));
    }
}
