// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use ndarray::Array2;

use crate::core::ScalarField;
use crate::error::{FieldError, Result};
use crate::partition::RowResult;

/// Stack ordered rows into a `(x_len, y_len)` field.
///
/// Row `i` of the result is `rows[i]`; nothing is reordered here.
///
/// # Errors
/// Returns [`FieldError::ShapeMismatch`] if the row count differs from
/// `x_len` or any row's length differs from `y_len`. Either case means the
/// partitioning or the pool broke its contract, so the field is discarded.
pub fn assemble(rows: Vec<RowResult>, x_len: usize, y_len: usize) -> Result<ScalarField> {
    if rows.len() != x_len {
        return Err(FieldError::ShapeMismatch {
            expected: vec![x_len, y_len],
            got: vec![rows.len(), y_len],
        });
    }
    if let Some(bad) = rows.iter().find(|r| r.len() != y_len) {
        return Err(FieldError::ShapeMismatch {
            expected: vec![x_len, y_len],
            got: vec![x_len, bad.len()],
        });
    }

    let mut data = Vec::with_capacity(x_len * y_len);
    for row in rows {
        data.extend_from_slice(&row);
    }
    let arr = Array2::from_shape_vec((x_len, y_len), data)
        .map_err(|e| FieldError::Other(format!("shape error: {}", e)))?;
    Ok(ScalarField::from_array(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacks_rows_in_order() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let field = assemble(rows, 2, 3).unwrap();
        assert_eq!(field.shape(), (2, 3));
        assert_eq!(field.get(0, 2), Some(3.0));
        assert_eq!(field.get(1, 0), Some(4.0));
    }

    #[test]
    fn short_row_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        let result = assemble(rows, 2, 2);
        match result {
            Err(FieldError::ShapeMismatch { expected, got }) => {
                assert_eq!(expected, vec![2, 2]);
                assert_eq!(got, vec![2, 1]);
            }
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn missing_row_rejected() {
        let rows = vec![vec![1.0, 2.0]];
        assert!(matches!(
            assemble(rows, 2, 2),
            Err(FieldError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn empty_axes() {
        let field = assemble(Vec::new(), 0, 5).unwrap();
        assert_eq!(field.shape(), (0, 5));

        let field = assemble(vec![Vec::new(), Vec::new()], 2, 0).unwrap();
        assert_eq!(field.shape(), (2, 0));
    }
}
