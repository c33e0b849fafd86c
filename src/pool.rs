// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_queue::SegQueue;
use tracing::{debug, warn};

use crate::error::{FieldError, Result};
use crate::kernels::Kernel;
use crate::partition::{RowResult, WorkItem};

/// Progress information passed to the optional callback.
#[derive(Debug, Clone, Copy)]
pub struct ProgressInfo {
    /// Number of rows finished so far.
    pub rows_completed: usize,
    /// Number of rows submitted.
    pub rows_total: usize,
    /// Number of workers currently evaluating a row.
    pub in_flight: usize,
    /// Elapsed time since the computation started.
    pub elapsed: Duration,
}

/// Shared flag used to abort an in-flight computation.
///
/// Clones observe the same flag. Workers check it before taking each row, so
/// cancellation takes effect after at most one row per worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// True once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

struct Failure {
    index: usize,
    x: f64,
    message: String,
}

/// A bounded set of worker threads that evaluate rows and return them in
/// submission order.
///
/// Threads are created when [`execute`](Self::execute) starts and all of them
/// are joined before it returns, on success, failure and cancellation alike.
/// A pool value therefore never holds live threads between computations.
pub struct WorkerPool {
    worker_count: usize,
    cancel: CancelToken,
}

impl WorkerPool {
    /// Create a pool that runs at most `worker_count` rows at once.
    ///
    /// # Errors
    /// Returns [`FieldError::InvalidWorkerCount`] if `worker_count` is zero.
    pub fn new(worker_count: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(FieldError::InvalidWorkerCount(worker_count));
        }
        Ok(WorkerPool {
            worker_count,
            cancel: CancelToken::new(),
        })
    }

    /// Attach a cancellation token (builder method).
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Number of workers.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Evaluate every item and return the rows in the order the items were
    /// given, regardless of which worker finished first.
    ///
    /// # Errors
    /// - [`FieldError::WorkerFailure`] if evaluating an item panicked. The
    ///   lowest failing submission index is reported and no row is returned.
    /// - [`FieldError::Cancelled`] if the cancel token fired before all rows
    ///   were done.
    pub fn execute<K: Kernel + ?Sized>(
        &self,
        items: Vec<WorkItem>,
        kernel: &K,
        progress_cb: Option<&(dyn Fn(ProgressInfo) + Sync)>,
    ) -> Result<Vec<RowResult>> {
        let rows_total = items.len();
        let queue: SegQueue<(usize, WorkItem)> = SegQueue::new();
        for (slot, item) in items.into_iter().enumerate() {
            queue.push((slot, item));
        }

        let results: SegQueue<(usize, RowResult)> = SegQueue::new();
        let failures: SegQueue<Failure> = SegQueue::new();
        let done = AtomicBool::new(false);
        let in_flight = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let start_time = Instant::now();
        let last_progress = AtomicU64::new(0);
        let num_threads = self.worker_count;

        debug!(workers = num_threads, rows = rows_total, "starting worker pool");

        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("densegrid-worker-{}", i))
            .build_scoped(
                |thread| thread.run(),
                |pool| {
                    pool.scope(|s| {
                        for _ in 0..num_threads {
                            s.spawn(|_| loop {
                                if done.load(Ordering::Acquire) || self.cancel.is_cancelled() {
                                    break;
                                }
                                let Some((slot, item)) = queue.pop() else {
                                    break;
                                };

                                in_flight.fetch_add(1, Ordering::AcqRel);
                                let outcome =
                                    panic::catch_unwind(AssertUnwindSafe(|| item.execute(kernel)));
                                in_flight.fetch_sub(1, Ordering::AcqRel);

                                match outcome {
                                    Ok(row) => {
                                        results.push((slot, row));
                                        let n = completed.fetch_add(1, Ordering::AcqRel) + 1;
                                        if let Some(cb) = progress_cb {
                                            report_progress(
                                                cb,
                                                &last_progress,
                                                start_time,
                                                ProgressInfo {
                                                    rows_completed: n,
                                                    rows_total,
                                                    in_flight: in_flight.load(Ordering::Relaxed),
                                                    elapsed: start_time.elapsed(),
                                                },
                                            );
                                        }
                                    }
                                    Err(payload) => {
                                        failures.push(Failure {
                                            index: slot,
                                            x: item.x,
                                            message: panic_message(payload.as_ref()),
                                        });
                                        done.store(true, Ordering::Release);
                                        break;
                                    }
                                }
                            });
                        }
                    });
                },
            )
            .map_err(|e| FieldError::Other(format!("failed to build worker pool: {}", e)))?;

        debug!(
            workers = num_threads,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "worker pool joined"
        );

        let mut failed: Vec<Failure> = std::iter::from_fn(|| failures.pop()).collect();
        if !failed.is_empty() {
            failed.sort_unstable_by_key(|f| f.index);
            let first = failed.swap_remove(0);
            warn!(index = first.index, x = first.x, "worker failed: {}", first.message);
            return Err(FieldError::WorkerFailure {
                index: first.index,
                x: first.x,
                message: first.message,
            });
        }

        let mut rows: Vec<(usize, RowResult)> = std::iter::from_fn(|| results.pop()).collect();
        if rows.len() < rows_total && self.cancel.is_cancelled() {
            return Err(FieldError::Cancelled);
        }
        if rows.len() != rows_total {
            return Err(FieldError::ShapeMismatch {
                expected: vec![rows_total],
                got: vec![rows.len()],
            });
        }

        rows.sort_unstable_by_key(|&(slot, _)| slot);
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }
}

fn report_progress(
    cb: &(dyn Fn(ProgressInfo) + Sync),
    last_progress: &AtomicU64,
    start_time: Instant,
    info: ProgressInfo,
) {
    let elapsed_ms = start_time.elapsed().as_millis() as u64;
    if info.rows_completed == info.rows_total {
        last_progress.store(elapsed_ms, Ordering::Relaxed);
        cb(info);
        return;
    }
    let last = last_progress.load(Ordering::Relaxed);
    if elapsed_ms >= last + 500
        && last_progress
            .compare_exchange(last, elapsed_ms, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    {
        cb(info);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Grid;
    use crate::kernels::{GaussianKernel, KernelParams};
    use crate::partition::partition_rows;
    use std::sync::Mutex;

    /// Records the highest number of simultaneous evaluations it observes.
    struct ConcurrencyProbe {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Kernel for ConcurrencyProbe {
        fn evaluate(&self, x: f64, y: f64, _params: &KernelParams) -> f64 {
            let now = self.active.fetch_add(1, Ordering::AcqRel) + 1;
            self.peak.fetch_max(now, Ordering::AcqRel);
            std::thread::sleep(Duration::from_micros(200));
            self.active.fetch_sub(1, Ordering::AcqRel);
            x + y
        }
    }

    /// Later rows finish first so completion order is the reverse of
    /// submission order.
    struct SlowFirstRows;

    impl Kernel for SlowFirstRows {
        fn evaluate(&self, x: f64, y: f64, _params: &KernelParams) -> f64 {
            let delay = ((2.0 - x) * 2000.0).max(0.0) as u64;
            std::thread::sleep(Duration::from_micros(delay));
            x * 100.0 + y
        }
    }

    struct PanicsAt(f64);

    impl Kernel for PanicsAt {
        fn evaluate(&self, x: f64, _y: f64, _params: &KernelParams) -> f64 {
            if (x - self.0).abs() < 1e-12 {
                panic!("kernel exploded at x={}", x);
            }
            1.0
        }
    }

    struct CancelAfterFirstRow(CancelToken);

    impl Kernel for CancelAfterFirstRow {
        fn evaluate(&self, _x: f64, _y: f64, _params: &KernelParams) -> f64 {
            self.0.cancel();
            std::thread::sleep(Duration::from_micros(100));
            0.0
        }
    }

    #[test]
    fn zero_workers_rejected() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(FieldError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn results_follow_submission_order() {
        let grid = Grid::from_bounds(0.0, 2.0, 0.0, 1.0, 0.25).unwrap();
        let items = partition_rows(&grid, KernelParams::default());
        let pool = WorkerPool::new(4).unwrap();
        let rows = pool.execute(items, &SlowFirstRows, None).unwrap();

        let xs = grid.x_axis().values();
        let ys = grid.y_axis().values();
        assert_eq!(rows.len(), xs.len());
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                assert_eq!(v, xs[i] * 100.0 + ys[j]);
            }
        }
    }

    #[test]
    fn concurrency_bounded_by_worker_count() {
        let grid = Grid::from_bounds(0.0, 4.0, 0.0, 1.0, 0.25).unwrap();
        for workers in [1, 2, 3] {
            let probe = ConcurrencyProbe {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            };
            let items = partition_rows(&grid, KernelParams::default());
            WorkerPool::new(workers)
                .unwrap()
                .execute(items, &probe, None)
                .unwrap();
            let peak = probe.peak.load(Ordering::Acquire);
            assert!(
                peak >= 1 && peak <= workers,
                "peak {} with {} workers",
                peak,
                workers
            );
        }
    }

    #[test]
    fn more_workers_than_rows() {
        let grid = Grid::from_bounds(0.0, 2.0, 0.0, 2.0, 1.0).unwrap();
        let items = partition_rows(&grid, KernelParams::default());
        let rows = WorkerPool::new(16)
            .unwrap()
            .execute(items, &GaussianKernel, None)
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn empty_input() {
        let rows = WorkerPool::new(2)
            .unwrap()
            .execute(Vec::new(), &GaussianKernel, None)
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn worker_panic_reports_row() {
        let grid = Grid::from_bounds(0.0, 3.0, 0.0, 1.0, 0.5).unwrap();
        let items = partition_rows(&grid, KernelParams::default());
        let result = WorkerPool::new(2)
            .unwrap()
            .execute(items, &PanicsAt(1.5), None);
        match result {
            Err(FieldError::WorkerFailure { index, x, message }) => {
                assert_eq!(index, 3);
                assert!((x - 1.5).abs() < 1e-12);
                assert!(message.contains("kernel exploded"));
            }
            other => panic!("expected WorkerFailure, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn pool_reusable_after_failure() {
        let grid = Grid::from_bounds(0.0, 2.0, 0.0, 1.0, 0.5).unwrap();
        let pool = WorkerPool::new(2).unwrap();
        let failed = pool.execute(
            partition_rows(&grid, KernelParams::default()),
            &PanicsAt(0.5),
            None,
        );
        assert!(failed.is_err());
        let ok = pool.execute(
            partition_rows(&grid, KernelParams::default()),
            &GaussianKernel,
            None,
        );
        assert_eq!(ok.unwrap().len(), 4);
    }

    #[test]
    fn cancellation_stops_dispatch() {
        let token = CancelToken::new();
        let grid = Grid::from_bounds(0.0, 50.0, 0.0, 1.0, 0.5).unwrap();
        let items = partition_rows(&grid, KernelParams::default());
        let pool = WorkerPool::new(2).unwrap().with_cancel(token.clone());
        let result = pool.execute(items, &CancelAfterFirstRow(token.clone()), None);
        assert!(matches!(result, Err(FieldError::Cancelled)));
        assert!(token.is_cancelled());
    }

    #[test]
    fn progress_reports_completion() {
        let grid = Grid::from_bounds(0.0, 2.0, 0.0, 1.0, 0.5).unwrap();
        let items = partition_rows(&grid, KernelParams::default());
        let seen = Mutex::new(Vec::new());
        let cb: &(dyn Fn(ProgressInfo) + Sync) =
            &|info: ProgressInfo| seen.lock().unwrap().push(info.rows_completed);
        WorkerPool::new(2)
            .unwrap()
            .execute(items, &GaussianKernel, Some(cb))
            .unwrap();
        let seen = seen.lock().unwrap().clone();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|&n| n >= 1 && n <= 4));
    }

    #[test]
    fn completion_reported_despite_throttle() {
        let start = Instant::now();
        // a recent report keeps the throttle closed
        let last_progress = AtomicU64::new(start.elapsed().as_millis() as u64);
        let seen = Mutex::new(Vec::new());
        let cb: &(dyn Fn(ProgressInfo) + Sync) =
            &|info: ProgressInfo| seen.lock().unwrap().push(info.rows_completed);
        let info = |done| ProgressInfo {
            rows_completed: done,
            rows_total: 4,
            in_flight: 0,
            elapsed: start.elapsed(),
        };

        report_progress(cb, &last_progress, start, info(3));
        report_progress(cb, &last_progress, start, info(4));
        report_progress(cb, &last_progress, start, info(4));
        assert_eq!(*seen.lock().unwrap(), vec![4, 4]);
    }

    #[test]
    fn completion_always_seen_by_callback() {
        let grid = Grid::from_bounds(0.0, 4.0, 0.0, 1.0, 0.25).unwrap();
        for workers in [1, 3, 8] {
            let items = partition_rows(&grid, KernelParams::default());
            let rows_total = items.len();
            let last = Mutex::new(None);
            let cb: &(dyn Fn(ProgressInfo) + Sync) = &|info: ProgressInfo| {
                if info.rows_completed == info.rows_total {
                    *last.lock().unwrap() = Some(info.rows_completed);
                }
            };
            WorkerPool::new(workers)
                .unwrap()
                .execute(items, &GaussianKernel, Some(cb))
                .unwrap();
            assert_eq!(*last.lock().unwrap(), Some(rows_total), "workers={}", workers);
        }
    }
}
