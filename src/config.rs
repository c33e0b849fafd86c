// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::Grid;
use crate::error::Result;
use crate::kernels::KernelParams;

/// Grid bounds, resolution and kernel width for one run.
///
/// Defaults cover `[-2, 2) x [-2, 2)` at a step of 0.001 with `sigma = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfig {
    /// Lower x bound (inclusive).
    pub xmin: f64,
    /// Upper x bound (exclusive).
    pub xmax: f64,
    /// Lower y bound (inclusive).
    pub ymin: f64,
    /// Upper y bound (exclusive).
    pub ymax: f64,
    /// Sample spacing on both axes.
    pub step: f64,
    /// Gaussian standard deviation.
    pub sigma: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            xmin: -2.0,
            xmax: 2.0,
            ymin: -2.0,
            ymax: 2.0,
            step: 0.001,
            sigma: 1.0,
        }
    }
}

impl RunConfig {
    /// Build and validate the grid and kernel parameters in one go, before
    /// any work is dispatched.
    ///
    /// # Errors
    /// Returns `InvalidRange` or `InvalidParameter` for bad values.
    pub fn build(&self) -> Result<(Grid, KernelParams)> {
        let grid = Grid::from_bounds(self.xmin, self.xmax, self.ymin, self.ymax, self.step)?;
        let params = KernelParams::new(self.sigma)?;
        Ok((grid, params))
    }
}
