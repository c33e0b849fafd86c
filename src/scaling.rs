// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Worker-count sweep for measuring parallel speedup.
//!
//! Every trial builds a fresh [`WorkerPool`], runs one full-grid computation
//! and tears the pool down before the next trial starts. The recorded time
//! spans pool construction to teardown, so thread start-up and join are part
//! of the measurement.

use std::time::Instant;

use tracing::{info, warn};

use crate::core::{Grid, ScalarField};
use crate::error::{FieldError, Result};
use crate::evaluator::compute_field;
use crate::kernels::{Kernel, KernelParams};
use crate::pool::{CancelToken, WorkerPool};

/// Detected parallel-execution capacity (at least 1).
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Candidate worker counts spanning under-, exact- and over-provisioning:
/// `1..=cores`, then `cores + 4` and `cores + 8`.
pub fn default_worker_counts(cores: usize) -> Vec<usize> {
    let cores = cores.max(1);
    let mut counts: Vec<usize> = (1..=cores).collect();
    counts.extend([cores + 4, cores + 8]);
    counts
}

/// Outcome of a single trial.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialStatus {
    /// The full grid was computed.
    Completed,
    /// A worker failed; the field was discarded.
    Failed {
        /// Rendered error.
        reason: String,
    },
}

/// One entry of the scaling series.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    /// Pool size used for this trial.
    pub worker_count: usize,
    /// Wall-clock time from pool construction to teardown.
    pub elapsed_seconds: f64,
    /// Whether the trial finished.
    pub status: TrialStatus,
}

impl TrialRecord {
    /// True if the trial computed the whole grid.
    pub fn is_completed(&self) -> bool {
        self.status == TrialStatus::Completed
    }
}

/// Trials in the order they ran, plus the core count they were planned
/// against.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingResult {
    /// One record per trial, in trial order.
    pub trials: Vec<TrialRecord>,
    /// Parallel capacity detected when the sweep was planned.
    pub physical_cores: usize,
}

impl ScalingResult {
    /// `(worker_count, elapsed_seconds)` for every completed trial.
    pub fn series(&self) -> Vec<(usize, f64)> {
        self.trials
            .iter()
            .filter(|t| t.is_completed())
            .map(|t| (t.worker_count, t.elapsed_seconds))
            .collect()
    }

    /// Speedup of each completed trial relative to the first completed one.
    pub fn speedups(&self) -> Vec<(usize, f64)> {
        let series = self.series();
        let Some(&(_, baseline)) = series.first() else {
            return Vec::new();
        };
        series
            .into_iter()
            .map(|(workers, secs)| (workers, baseline / secs))
            .collect()
    }

    /// Number of failed trials.
    pub fn failures(&self) -> usize {
        self.trials.iter().filter(|t| !t.is_completed()).count()
    }

    /// Completed trial with the shortest runtime.
    pub fn fastest(&self) -> Option<&TrialRecord> {
        self.trials
            .iter()
            .filter(|t| t.is_completed())
            .min_by(|a, b| a.elapsed_seconds.total_cmp(&b.elapsed_seconds))
    }
}

/// Repeats a full-grid computation across a list of worker counts.
pub struct ScalingHarness<'a, K: Kernel + ?Sized> {
    grid: Grid,
    kernel: &'a K,
    params: KernelParams,
    worker_counts: Vec<usize>,
    physical_cores: usize,
    cancel: CancelToken,
}

impl<'a, K: Kernel + ?Sized> ScalingHarness<'a, K> {
    /// Create a harness using [`default_worker_counts`] for the detected core count.
    pub fn new(grid: Grid, kernel: &'a K, params: KernelParams) -> Self {
        let physical_cores = available_cores();
        ScalingHarness {
            grid,
            kernel,
            params,
            worker_counts: default_worker_counts(physical_cores),
            physical_cores,
            cancel: CancelToken::new(),
        }
    }

    /// Replace the candidate worker counts (builder method). Order is kept.
    pub fn with_worker_counts(mut self, counts: Vec<usize>) -> Self {
        self.worker_counts = counts;
        self
    }

    /// Attach a cancellation token (builder method).
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Planned worker counts.
    pub fn worker_counts(&self) -> &[usize] {
        &self.worker_counts
    }

    /// Run every trial in order.
    ///
    /// A worker failure marks that trial as failed and the sweep continues.
    ///
    /// # Errors
    /// - [`FieldError::InvalidParameter`] or [`FieldError::InvalidWorkerCount`]
    ///   before any trial runs.
    /// - [`FieldError::Cancelled`] if the cancel token fires; the running
    ///   trial's workers are joined first.
    /// - [`FieldError::ShapeMismatch`] if a trial produced malformed rows.
    pub fn run(&self) -> Result<ScalingResult> {
        self.kernel.validate(&self.params)?;
        if let Some(&bad) = self.worker_counts.iter().find(|&&n| n == 0) {
            return Err(FieldError::InvalidWorkerCount(bad));
        }

        let (nx, ny) = self.grid.shape();
        info!(
            rows = nx,
            cols = ny,
            cores = self.physical_cores,
            trials = self.worker_counts.len(),
            "starting scaling sweep"
        );

        let mut trials = Vec::with_capacity(self.worker_counts.len());
        for &workers in &self.worker_counts {
            if self.cancel.is_cancelled() {
                return Err(FieldError::Cancelled);
            }
            let record = self.run_trial(workers)?;
            trials.push(record);
        }

        Ok(ScalingResult {
            trials,
            physical_cores: self.physical_cores,
        })
    }

    fn run_trial(&self, workers: usize) -> Result<TrialRecord> {
        let start = Instant::now();
        let outcome = {
            let pool = WorkerPool::new(workers)?.with_cancel(self.cancel.clone());
            compute_field(&self.grid, self.kernel, self.params, &pool, None)
        };
        let elapsed_seconds = start.elapsed().as_secs_f64();
        let status = trial_status(workers, elapsed_seconds, outcome)?;

        Ok(TrialRecord {
            worker_count: workers,
            elapsed_seconds,
            status,
        })
    }
}

/// Classify a trial outcome. Worker failures are recorded and the sweep goes
/// on; cancellation and malformed rows end it.
fn trial_status(
    workers: usize,
    elapsed_seconds: f64,
    outcome: Result<ScalarField>,
) -> Result<TrialStatus> {
    match outcome {
        Ok(_) => {
            info!(workers, elapsed_seconds, "trial completed");
            Ok(TrialStatus::Completed)
        }
        Err(FieldError::Cancelled) => Err(FieldError::Cancelled),
        Err(e @ FieldError::ShapeMismatch { .. }) => Err(e),
        Err(e) => {
            warn!(workers, elapsed_seconds, "trial failed: {}", e);
            Ok(TrialStatus::Failed {
                reason: e.to_string(),
            })
        }
    }
}
