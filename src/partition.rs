// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::Arc;

use crate::core::Grid;
use crate::kernels::{Kernel, KernelParams};

/// Kernel values for one grid row, in y-axis order.
pub type RowResult = Vec<f64>;

/// One grid row: a single x-coordinate paired with the full y-axis.
///
/// Items are self-contained. The y-axis samples are shared read-only between
/// all items of a run; nothing in an item is ever written after partitioning.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Submission index (equals the x-axis index).
    pub index: usize,
    /// The row's x-coordinate.
    pub x: f64,
    /// Every y-axis sample, in order.
    pub y_axis: Arc<[f64]>,
    /// Kernel parameters for the run.
    pub params: KernelParams,
}

impl WorkItem {
    /// Evaluate the kernel across the whole row.
    pub fn execute<K: Kernel + ?Sized>(&self, kernel: &K) -> RowResult {
        self.y_axis
            .iter()
            .map(|&y| kernel.evaluate(self.x, y, &self.params))
            .collect()
    }
}

/// Split a grid into one work item per x-axis sample, in x-axis order.
///
/// Rows rather than single points are the unit of work so that dispatch
/// overhead is paid once per `|y|` kernel evaluations.
pub fn partition_rows(grid: &Grid, params: KernelParams) -> Vec<WorkItem> {
    let y_axis: Arc<[f64]> = grid.y_axis().values().into();
    grid.x_axis()
        .iter()
        .enumerate()
        .map(|(index, x)| WorkItem {
            index,
            x,
            y_axis: Arc::clone(&y_axis),
            params,
        })
        .collect()
}
