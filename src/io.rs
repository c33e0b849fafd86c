// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::{Grid, ScalarField};
use crate::error::{FieldError, Result};
use crate::scaling::ScalingResult;

/// Supported file formats for field output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// MATLAB .mat format (Level 5).
    Mat,
}

impl FileFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Npy => "npy",
            FileFormat::Mat => "mat",
        }
    }
}

/// Infer file format from extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some("mat") => Ok(FileFormat::Mat),
        Some(ext) => Err(FieldError::UnsupportedFileFormat(ext.to_string())),
        None => Err(FieldError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// Output path for a field computed over `grid`, named after its x-bounds:
/// `<dir>/gaussian_<xmin>_<xmax>.<ext>`.
pub fn field_output_path(dir: &Path, grid: &Grid, format: FileFormat) -> PathBuf {
    let x = grid.x_axis();
    dir.join(format!(
        "gaussian_{:?}_{:?}.{}",
        x.min(),
        x.max(),
        format.extension()
    ))
}

fn write_error(path: &Path, reason: impl ToString) -> FieldError {
    FieldError::OutputWrite {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Save a field to a .npy file (row-major, shape `(|x|, |y|)`).
pub fn save_npy(field: &ScalarField, path: &Path) -> Result<()> {
    ndarray_npy::write_npy(path, field.as_array()).map_err(|e| write_error(path, e))
}

/// Save a field to a MATLAB Level 5 .mat file as variable `var_name`.
///
/// MATLAB sees a `|x| x |y|` double matrix, so `field(i, j)` in MATLAB is
/// row `i`, column `j` of the field.
pub fn save_mat(field: &ScalarField, path: &Path, var_name: &str) -> Result<()> {
    let (nx, ny) = field.shape();
    // column-major: transpose, then read in standard order
    let col_major: Vec<f64> = field.as_array().t().iter().copied().collect();
    write_mat_level5(path, var_name, &[nx, ny], &col_major).map_err(|e| write_error(path, e))
}

/// Byte sizes of the sub-elements of one miMATRIX element, unpadded except
/// for `matrix`, which is the padded total.
#[derive(Debug, PartialEq)]
struct MatSizes {
    dims: u32,
    name: u32,
    real: u32,
    matrix: u32,
}

/// `None` when the array does not fit the 32-bit sizes of the format.
fn mat_sizes(num_dims: usize, name_len: usize, data_len: usize) -> Option<MatSizes> {
    let padded = |n: u32| n.checked_add(7).map(|v| v / 8 * 8);
    let dims = u32::try_from(num_dims.checked_mul(4)?).ok()?;
    let name = u32::try_from(name_len).ok()?;
    let real = u32::try_from(data_len.checked_mul(8)?).ok()?;
    // array flags (16 bytes), then a tag plus padded payload per sub-element
    let matrix = [16, 8, padded(dims)?, 8, padded(name)?, 8, padded(real)?]
        .into_iter()
        .try_fold(0u32, |acc, n| acc.checked_add(n))?;
    Some(MatSizes {
        dims,
        name,
        real,
        matrix,
    })
}

/// Minimal MAT-file Level 5 writer for a single real f64 array.
///
/// Layout: a 128-byte header, then one miMATRIX element holding the array
/// flags, dimensions, name and real part sub-elements. Every sub-element is
/// padded to 8 bytes. The `matfile` crate only reads this format, hence the
/// hand-rolled writer.
fn write_mat_level5(
    path: &Path,
    var_name: &str,
    dimensions: &[usize],
    data: &[f64],
) -> std::io::Result<()> {
    const MI_INT8: u32 = 1;
    const MI_INT32: u32 = 5;
    const MI_UINT32: u32 = 6;
    const MI_DOUBLE: u32 = 9;
    const MI_MATRIX: u32 = 14;
    const MX_DOUBLE_CLASS: u32 = 6;

    let too_large = || {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("array of shape {:?} is too large for MAT Level 5", dimensions),
        )
    };
    let sizes = mat_sizes(dimensions.len(), var_name.len(), data.len()).ok_or_else(too_large)?;
    let dims = dimensions
        .iter()
        .map(|&d| i32::try_from(d).map_err(|_| too_large()))
        .collect::<std::io::Result<Vec<i32>>>()?;
    let pad = |n: u32| vec![0u8; (n.next_multiple_of(8) - n) as usize];

    let mut w = BufWriter::new(File::create(path)?);

    let desc = b"MATLAB 5.0 MAT-file, created by densegrid";
    let mut header_text = [b' '; 116];
    let copy_len = desc.len().min(116);
    header_text[..copy_len].copy_from_slice(&desc[..copy_len]);
    w.write_all(&header_text)?;
    // subsystem offset (unused), version 0x0100, little-endian marker
    w.write_all(&[0u8; 8])?;
    w.write_all(&0x0100u16.to_le_bytes())?;
    w.write_all(b"IM")?;

    w.write_all(&MI_MATRIX.to_le_bytes())?;
    w.write_all(&sizes.matrix.to_le_bytes())?;

    // array flags
    w.write_all(&MI_UINT32.to_le_bytes())?;
    w.write_all(&8u32.to_le_bytes())?;
    w.write_all(&MX_DOUBLE_CLASS.to_le_bytes())?;
    w.write_all(&0u32.to_le_bytes())?;

    // dimensions
    w.write_all(&MI_INT32.to_le_bytes())?;
    w.write_all(&sizes.dims.to_le_bytes())?;
    for d in dims {
        w.write_all(&d.to_le_bytes())?;
    }
    w.write_all(&pad(sizes.dims))?;

    // name
    w.write_all(&MI_INT8.to_le_bytes())?;
    w.write_all(&sizes.name.to_le_bytes())?;
    w.write_all(var_name.as_bytes())?;
    w.write_all(&pad(sizes.name))?;

    // real part
    w.write_all(&MI_DOUBLE.to_le_bytes())?;
    w.write_all(&sizes.real.to_le_bytes())?;
    for &val in data {
        w.write_all(&val.to_le_bytes())?;
    }

    w.flush()
}

/// Save a field, inferring the format from the extension. Returns the
/// final path.
pub fn save_field(field: &ScalarField, path: &Path) -> Result<PathBuf> {
    match infer_format(path)? {
        FileFormat::Npy => save_npy(field, path)?,
        FileFormat::Mat => save_mat(field, path, "density")?,
    }
    info!(path = %path.display(), shape = ?field.shape(), "saved field");
    Ok(path.to_path_buf())
}

/// Write the scaling series as CSV, one line per trial in trial order.
///
/// ```text
/// # physical_cores=8
/// worker_count,elapsed_seconds,status
/// 1,12.034512,completed
/// 2,6.120931,failed
/// ```
pub fn write_scaling_csv(result: &ScalingResult, path: &Path) -> Result<PathBuf> {
    let write = || -> std::io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "# physical_cores={}", result.physical_cores)?;
        writeln!(w, "worker_count,elapsed_seconds,status")?;
        for t in &result.trials {
            let status = if t.is_completed() { "completed" } else { "failed" };
            writeln!(w, "{},{:.6},{}", t.worker_count, t.elapsed_seconds, status)?;
        }
        w.flush()
    };
    write().map_err(|e| write_error(path, e))?;
    info!(path = %path.display(), trials = result.trials.len(), "saved scaling series");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaling::{TrialRecord, TrialStatus};
    use ndarray::{Array2, ArrayD};

    fn make_test_field() -> ScalarField {
        let data: Vec<f64> = (0..12).map(|v| v as f64).collect();
        ScalarField::from_array(Array2::from_shape_vec((3, 4), data).unwrap())
    }

    #[test]
    fn npy_written_row_major() {
        let field = make_test_field();
        let tmp = std::env::temp_dir().join("densegrid_test_field.npy");
        let saved = save_field(&field, &tmp).unwrap();
        assert_eq!(saved, tmp);

        let loaded: ArrayD<f64> = ndarray_npy::read_npy(&tmp).unwrap();
        assert_eq!(loaded.shape(), &[3, 4]);
        for (k, &v) in loaded.iter().enumerate() {
            assert!((v - k as f64).abs() < 1e-12);
        }
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn mat_readable_by_matfile() {
        let field = make_test_field();
        let tmp = std::env::temp_dir().join("densegrid_test_field.mat");
        save_field(&field, &tmp).unwrap();

        let file = std::fs::File::open(&tmp).unwrap();
        let mut reader = std::io::BufReader::new(file);
        let mat = matfile::MatFile::parse(&mut reader).unwrap();
        let arr = mat.find_by_name("density").unwrap();
        assert_eq!(arr.size().to_vec(), vec![3, 4]);

        match arr.data() {
            matfile::NumericData::Double { real, imag: _ } => {
                assert_eq!(real.len(), 12);
                // column-major: element (i, j) at i + j * rows
                for i in 0..3 {
                    for j in 0..4 {
                        assert_eq!(real[i + j * 3], field.get(i, j).unwrap());
                    }
                }
            }
            _ => panic!("Expected double data"),
        }
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn mat_sizes_padded_and_bounded() {
        // 2 dims, "density", 12 doubles
        let sizes = mat_sizes(2, 7, 12).unwrap();
        assert_eq!(
            sizes,
            MatSizes {
                dims: 8,
                name: 7,
                real: 96,
                matrix: 16 + 8 + 8 + 8 + 8 + 8 + 96,
            }
        );

        // real part alone exceeds u32
        assert_eq!(mat_sizes(2, 7, 1 << 29), None);
        // real part fits but the element total does not
        assert_eq!(mat_sizes(2, 7, (u32::MAX as usize) / 8), None);
        assert_eq!(mat_sizes(2, 7, usize::MAX), None);
    }

    #[test]
    fn oversized_mat_dimension_reports_output_error() {
        // zero-area field with a row count past i32
        let field = ScalarField::from_array(Array2::zeros((1usize << 31, 0)));
        let tmp = std::env::temp_dir().join("densegrid_test_oversized.mat");
        std::fs::remove_file(&tmp).ok();
        match save_field(&field, &tmp) {
            Err(FieldError::OutputWrite { path, reason }) => {
                assert_eq!(path, tmp);
                assert!(reason.contains("too large for MAT Level 5"), "reason: {}", reason);
            }
            other => panic!("expected OutputWrite, got {:?}", other),
        }
        assert!(!tmp.exists());
    }

    #[test]
    fn unsupported_format() {
        let field = make_test_field();
        let result = save_field(&field, Path::new("field.png"));
        assert!(matches!(
            result,
            Err(FieldError::UnsupportedFileFormat(_))
        ));
        assert!(matches!(
            infer_format(Path::new("field")),
            Err(FieldError::UnsupportedFileFormat(_))
        ));
    }

    #[test]
    fn unwritable_path_reports_output_error() {
        let field = make_test_field();
        let path = std::env::temp_dir()
            .join("densegrid_missing_dir")
            .join("nested")
            .join("field.npy");
        let result = save_field(&field, &path);
        assert!(matches!(result, Err(FieldError::OutputWrite { .. })));
    }

    #[test]
    fn output_path_embeds_x_bounds() {
        let grid = Grid::from_bounds(-2.0, 0.5, -1.0, 1.0, 0.25).unwrap();
        let path = field_output_path(Path::new("out"), &grid, FileFormat::Npy);
        assert_eq!(path, Path::new("out").join("gaussian_-2.0_0.5.npy"));
    }

    #[test]
    fn scaling_csv_lines() {
        let result = ScalingResult {
            trials: vec![
                TrialRecord {
                    worker_count: 1,
                    elapsed_seconds: 2.5,
                    status: TrialStatus::Completed,
                },
                TrialRecord {
                    worker_count: 2,
                    elapsed_seconds: 0.75,
                    status: TrialStatus::Failed {
                        reason: "worker failed".to_string(),
                    },
                },
            ],
            physical_cores: 2,
        };
        let tmp = std::env::temp_dir().join("densegrid_test_scaling.csv");
        write_scaling_csv(&result, &tmp).unwrap();
        let text = std::fs::read_to_string(&tmp).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# physical_cores=2",
                "worker_count,elapsed_seconds,status",
                "1,2.500000,completed",
                "2,0.750000,failed",
            ]
        );
        std::fs::remove_file(&tmp).ok();
    }
}
