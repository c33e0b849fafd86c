// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur during grid setup, parallel evaluation, or output.
#[derive(Debug)]
pub enum FieldError {
    /// Axis bounds or step are invalid (non-positive step, inverted bounds,
    /// or non-finite values).
    InvalidRange {
        /// Axis name ("x" or "y").
        axis: &'static str,
        /// Lower bound (inclusive).
        min: f64,
        /// Upper bound (exclusive).
        max: f64,
        /// Sample spacing.
        step: f64,
    },
    /// Kernel parameter is out of its valid domain.
    InvalidParameter {
        /// The parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// Worker count must be at least one.
    InvalidWorkerCount(usize),
    /// A worker terminated abnormally while executing a work item.
    WorkerFailure {
        /// Submission index of the failed item.
        index: usize,
        /// The x-coordinate of the failed row.
        x: f64,
        /// Panic message captured from the worker.
        message: String,
    },
    /// Partial results do not match the expected field shape.
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// The computation was cancelled before it completed.
    Cancelled,
    /// Unsupported output format (unrecognized extension).
    UnsupportedFileFormat(String),
    /// Writing a result to disk failed.
    OutputWrite {
        /// Destination path.
        path: PathBuf,
        /// Explanation of the failure.
        reason: String,
    },
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::InvalidRange {
                axis,
                min,
                max,
                step,
            } => {
                write!(
                    f,
                    "invalid {} range: min={} max={} step={} (step must be positive and max >= min)",
                    axis, min, max, step
                )
            }
            FieldError::InvalidParameter { name, value } => {
                write!(
                    f,
                    "invalid kernel parameter {}: {} (must be positive and finite)",
                    name, value
                )
            }
            FieldError::InvalidWorkerCount(n) => {
                write!(f, "invalid worker count: {} (must be >= 1)", n)
            }
            FieldError::WorkerFailure { index, x, message } => {
                write!(
                    f,
                    "worker failed on item {} (x={}): {}",
                    index, x, message
                )
            }
            FieldError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {:?}, got {:?}", expected, got)
            }
            FieldError::Cancelled => write!(f, "computation cancelled"),
            FieldError::UnsupportedFileFormat(ext) => {
                write!(f, "unsupported file format: {}", ext)
            }
            FieldError::OutputWrite { path, reason } => {
                write!(f, "failed to write {}: {}", path.display(), reason)
            }
            FieldError::IoError(e) => write!(f, "I/O error: {}", e),
            FieldError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FieldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FieldError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FieldError {
    fn from(e: std::io::Error) -> Self {
        FieldError::IoError(e)
    }
}

/// Convenience type alias for Results with FieldError.
pub type Result<T> = std::result::Result<T, FieldError>;
