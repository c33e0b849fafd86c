// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! A parallel dense-grid scalar-field evaluator.
//!
//! This library evaluates a pointwise kernel (by default the 2D Gaussian
//! density) at every point of a rectangular grid. The grid is split into one
//! work item per row, rows are evaluated by a bounded pool of worker threads,
//! and the results are stacked back into a matrix in axis order. A scaling
//! harness repeats the computation across worker-pool sizes and records the
//! wall-clock time of each trial.

#![warn(missing_docs)]

/// Stacking of ordered rows into a field.
pub mod aggregate;
/// Run configuration with reference defaults.
pub mod config;
/// Grid axes, grids and scalar fields.
pub mod core;
/// Error types for the library.
pub mod error;
/// Full-grid evaluation, parallel and serial.
pub mod evaluator;
/// File output for fields and scaling series.
pub mod io;
/// Pointwise kernels.
pub mod kernels;
/// Row partitioning of a grid into work items.
pub mod partition;
/// Bounded, order-preserving worker pool.
pub mod pool;
/// SVG figures for fields and scaling sweeps.
pub mod render;
/// Worker-count sweeps and their timing series.
pub mod scaling;

pub use crate::config::RunConfig;
pub use crate::core::{Grid, GridAxis, ScalarField};
pub use crate::error::{FieldError, Result};
pub use crate::evaluator::{evaluate_serial, FieldEvaluator};
pub use crate::kernels::{GaussianKernel, Kernel, KernelParams};
pub use crate::pool::{CancelToken, ProgressInfo, WorkerPool};
pub use crate::scaling::{ScalingHarness, ScalingResult, TrialRecord, TrialStatus};
