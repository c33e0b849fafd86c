// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregate::assemble;
use crate::core::{Grid, ScalarField};
use crate::error::Result;
use crate::kernels::{Kernel, KernelParams};
use crate::partition::partition_rows;
use crate::pool::{CancelToken, ProgressInfo, WorkerPool};

/// Run one full-grid computation on `pool`: partition into rows, evaluate,
/// and stack the rows into a field.
///
/// Parameters are checked before any row is dispatched.
pub fn compute_field<K: Kernel + ?Sized>(
    grid: &Grid,
    kernel: &K,
    params: KernelParams,
    pool: &WorkerPool,
    progress_cb: Option<&(dyn Fn(ProgressInfo) + Sync)>,
) -> Result<ScalarField> {
    kernel.validate(&params)?;
    let (nx, ny) = grid.shape();
    let items = partition_rows(grid, params);
    let rows = pool.execute(items, kernel, progress_cb)?;
    assemble(rows, nx, ny)
}

/// Evaluate the kernel point by point on the calling thread.
///
/// Used as the reference result for the parallel path.
pub fn evaluate_serial<K: Kernel + ?Sized>(
    grid: &Grid,
    kernel: &K,
    params: KernelParams,
) -> Result<ScalarField> {
    kernel.validate(&params)?;
    let (nx, ny) = grid.shape();
    let ys = grid.y_axis().values();
    let rows = grid
        .x_axis()
        .iter()
        .map(|x| ys.iter().map(|&y| kernel.evaluate(x, y, &params)).collect())
        .collect();
    assemble(rows, nx, ny)
}

/// A parallel evaluator for a kernel over a dense grid.
///
/// Parameters are validated when the evaluator is built, before any worker
/// exists. Each call to [`evaluate`](Self::evaluate) creates its own worker
/// threads and joins them before returning.
pub struct FieldEvaluator<K: Kernel> {
    grid: Grid,
    kernel: K,
    params: KernelParams,
    num_workers: Option<usize>,
    cancel: CancelToken,
    progress_callback: Option<Box<dyn Fn(ProgressInfo) + Send + Sync>>,
}

impl<K: Kernel> FieldEvaluator<K> {
    /// Create a new evaluator.
    ///
    /// # Errors
    /// Returns [`FieldError::InvalidParameter`](crate::FieldError::InvalidParameter)
    /// if the kernel rejects `params`.
    pub fn new(grid: Grid, kernel: K, params: KernelParams) -> Result<Self> {
        kernel.validate(&params)?;
        Ok(FieldEvaluator {
            grid,
            kernel,
            params,
            num_workers: None,
            cancel: CancelToken::new(),
            progress_callback: None,
        })
    }

    /// Set the number of workers (builder method).
    /// If not specified, defaults to the number of available CPU cores.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.num_workers = Some(workers);
        self
    }

    /// Attach a cancellation token (builder method).
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set a progress callback invoked at most every 500ms (builder method).
    pub fn with_progress(mut self, callback: Box<dyn Fn(ProgressInfo) + Send + Sync>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Get a reference to the grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Get the kernel parameters.
    pub fn params(&self) -> KernelParams {
        self.params
    }

    /// Number of workers the next evaluation will use.
    pub fn num_workers(&self) -> usize {
        self.num_workers.unwrap_or_else(crate::scaling::available_cores)
    }

    /// Compute the field.
    ///
    /// The result does not depend on the worker count.
    ///
    /// # Errors
    /// Returns an error if the worker count is zero, a worker fails, or the
    /// computation is cancelled.
    pub fn evaluate(&self) -> Result<ScalarField> {
        let pool = WorkerPool::new(self.num_workers())?.with_cancel(self.cancel.clone());
        let progress = self
            .progress_callback
            .as_deref()
            .map(|cb| cb as &(dyn Fn(ProgressInfo) + Sync));
        compute_field(&self.grid, &self.kernel, self.params, &pool, progress)
    }
}
