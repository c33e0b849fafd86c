// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use ndarray::{Array2, ArrayView1};

use crate::error::{FieldError, Result};

/// Largest number of samples an axis may hold.
///
/// Fields are dense `f64` matrices and MAT files store dimensions as `i32`.
pub const MAX_AXIS_SAMPLES: usize = i32::MAX as usize;

/// An ordered sequence of coordinate samples `min + i * step` over the
/// half-open interval `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAxis {
    min: f64,
    max: f64,
    step: f64,
    len: usize,
}

impl GridAxis {
    /// Create a new axis named `axis` (used in error reports).
    ///
    /// # Parameters
    /// - `min`: First sample (inclusive)
    /// - `max`: Upper bound (exclusive)
    /// - `step`: Sample spacing (must be positive and finite)
    ///
    /// # Errors
    /// Returns [`FieldError::InvalidRange`] if the step is not positive, any
    /// value is non-finite, the bounds are inverted (`max < min`), or the
    /// axis would exceed [`MAX_AXIS_SAMPLES`]. Equal bounds give an empty axis.
    pub fn new(axis: &'static str, min: f64, max: f64, step: f64) -> Result<Self> {
        let invalid_range = || FieldError::InvalidRange {
            axis,
            min,
            max,
            step,
        };
        let invalid = !min.is_finite()
            || !max.is_finite()
            || !step.is_finite()
            || step <= 0.0
            || max < min;
        if invalid {
            return Err(invalid_range());
        }

        // (max - min) can overflow to infinity for extreme finite bounds
        let samples = ((max - min) / step).ceil();
        if !samples.is_finite() || samples > MAX_AXIS_SAMPLES as f64 {
            return Err(invalid_range());
        }
        let len = samples as usize;
        Ok(GridAxis {
            min,
            max,
            step,
            len,
        })
    }

    /// Lower bound (the first sample).
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Exclusive upper bound.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Sample spacing.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the axis yields no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The `i`-th sample, or `None` past the end.
    pub fn get(&self, i: usize) -> Option<f64> {
        (i < self.len).then(|| self.min + i as f64 * self.step)
    }

    /// Iterate over the samples in axis order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        (0..self.len).map(move |i| self.min + i as f64 * self.step)
    }

    /// Collect the samples into a vector.
    pub fn values(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

/// Plot extent `(xmin, xmax, ymin, ymax)` of a grid.
pub type Extent = (f64, f64, f64, f64);

/// Cartesian product of an x-axis and a y-axis. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    x: GridAxis,
    y: GridAxis,
}

impl Grid {
    /// Build a grid from two validated axes.
    pub fn new(x: GridAxis, y: GridAxis) -> Self {
        Grid { x, y }
    }

    /// Build a grid with the same step on both axes.
    ///
    /// # Errors
    /// Returns [`FieldError::InvalidRange`] if either axis is invalid.
    pub fn from_bounds(xmin: f64, xmax: f64, ymin: f64, ymax: f64, step: f64) -> Result<Self> {
        Ok(Grid {
            x: GridAxis::new("x", xmin, xmax, step)?,
            y: GridAxis::new("y", ymin, ymax, step)?,
        })
    }

    /// The x-axis (one row per sample).
    pub fn x_axis(&self) -> &GridAxis {
        &self.x
    }

    /// The y-axis (one column per sample).
    pub fn y_axis(&self) -> &GridAxis {
        &self.y
    }

    /// Field shape `(|x|, |y|)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.x.len(), self.y.len())
    }

    /// Total number of grid points, or `None` if it does not fit in `usize`.
    pub fn num_points(&self) -> Option<usize> {
        self.x.len().checked_mul(self.y.len())
    }

    /// True if either axis is empty.
    pub fn is_degenerate(&self) -> bool {
        self.x.is_empty() || self.y.is_empty()
    }

    /// Bounds of the grid as `(xmin, xmax, ymin, ymax)`.
    pub fn extent(&self) -> Extent {
        (self.x.min(), self.x.max(), self.y.min(), self.y.max())
    }
}

/// Dense matrix of kernel values. Row `i` belongs to `x_axis[i]`, column `j`
/// to `y_axis[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    data: Array2<f64>,
}

impl ScalarField {
    /// Wrap an existing matrix.
    pub fn from_array(data: Array2<f64>) -> Self {
        ScalarField { data }
    }

    /// Field shape `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Value at row `i`, column `j`.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.data.get((i, j)).copied()
    }

    /// View of row `i`.
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    /// Borrow the underlying matrix.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    /// Consume the field and return the underlying matrix.
    pub fn into_array(self) -> Array2<f64> {
        self.data
    }

    /// Smallest and largest value, or `None` for an empty field.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.data.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Largest element-wise absolute difference to `other`, or `None` if the
    /// shapes differ.
    pub fn max_abs_diff(&self, other: &ScalarField) -> Option<f64> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            self.data
                .iter()
                .zip(other.data.iter())
                .fold(0.0_f64, |m, (a, b)| m.max((a - b).abs())),
        )
    }
}
