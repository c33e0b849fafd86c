// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use densegrid::io::{self, FileFormat};
use densegrid::render::{self, FieldPlotMeta};
use densegrid::scaling::{self, ScalingHarness};
use densegrid::{FieldEvaluator, GaussianKernel, ProgressInfo, RunConfig};

#[derive(Parser)]
#[command(name = "densegrid", about = "Parallel 2D Gaussian grid evaluator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate the field once and save it
    Evaluate(EvaluateArgs),
    /// Sweep worker counts and time each full-grid computation
    Scale(ScaleArgs),
}

#[derive(Args)]
struct GridArgs {
    /// Lower x bound (inclusive)
    #[arg(long, default_value = "-2.0", allow_hyphen_values = true)]
    xmin: f64,

    /// Upper x bound (exclusive)
    #[arg(long, default_value = "2.0", allow_hyphen_values = true)]
    xmax: f64,

    /// Lower y bound (inclusive)
    #[arg(long, default_value = "-2.0", allow_hyphen_values = true)]
    ymin: f64,

    /// Upper y bound (exclusive)
    #[arg(long, default_value = "2.0", allow_hyphen_values = true)]
    ymax: f64,

    /// Grid spacing on both axes
    #[arg(long, default_value = "0.001")]
    step: f64,

    /// Gaussian standard deviation
    #[arg(long, default_value = "1.0")]
    sigma: f64,
}

impl GridArgs {
    fn config(&self) -> RunConfig {
        RunConfig {
            xmin: self.xmin,
            xmax: self.xmax,
            ymin: self.ymin,
            ymax: self.ymax,
            step: self.step,
            sigma: self.sigma,
        }
    }
}

#[derive(Args)]
struct EvaluateArgs {
    #[command(flatten)]
    grid: GridArgs,

    /// Number of worker threads (default: available cores)
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Output file (.npy or .mat); default derives the name from the x-bounds
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Directory for the derived output name
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Also render the field as an SVG heatmap at this path
    #[arg(long)]
    plot: Option<PathBuf>,

    /// Print progress to stderr
    #[arg(long)]
    progress: bool,
}

#[derive(Args)]
struct ScaleArgs {
    #[command(flatten)]
    grid: GridArgs,

    /// Worker counts to test, comma-separated (default: 1..=P, P+4, P+8)
    #[arg(long)]
    worker_counts: Option<String>,

    /// Write the series as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Render runtime vs worker count as SVG
    #[arg(long)]
    plot: Option<PathBuf>,
}

fn parse_worker_counts(s: &str) -> Result<Vec<usize>> {
    let counts: Vec<usize> = s
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("invalid --worker-counts: expected comma-separated integers")?;
    if counts.is_empty() {
        bail!("--worker-counts must name at least one count");
    }
    Ok(counts)
}

fn run_evaluate(args: &EvaluateArgs) -> Result<()> {
    let (grid, params) = args.grid.config().build()?;
    let (nx, ny) = grid.shape();

    let mut evaluator = FieldEvaluator::new(grid, GaussianKernel, params)?;
    if let Some(workers) = args.workers {
        evaluator = evaluator.with_workers(workers);
    }
    if args.progress {
        evaluator = evaluator.with_progress(Box::new(|info: ProgressInfo| {
            eprintln!(
                "[{:.1}s] rows={}/{} in_flight={}",
                info.elapsed.as_secs_f64(),
                info.rows_completed,
                info.rows_total,
                info.in_flight,
            );
        }));
    }

    info!(rows = nx, cols = ny, workers = evaluator.num_workers(), "evaluating field");
    let start = Instant::now();
    let field = evaluator.evaluate().context("field evaluation failed")?;
    info!(elapsed_seconds = start.elapsed().as_secs_f64(), "field evaluated");

    let output = match &args.output {
        Some(path) => path.clone(),
        None => io::field_output_path(&args.out_dir, &grid, FileFormat::Npy),
    };
    let saved = io::save_field(&field, &output)
        .with_context(|| format!("failed to save field to {}", output.display()))?;
    println!("Successfully saved {}", saved.display());

    if let Some(plot) = &args.plot {
        let saved = render::render_field(&field, &FieldPlotMeta::for_grid(&grid), plot, None)?;
        println!("Successfully saved {}", saved.display());
    }
    Ok(())
}

fn run_scale(args: &ScaleArgs) -> Result<()> {
    let (grid, params) = args.grid.config().build()?;

    let mut harness = ScalingHarness::new(grid, &GaussianKernel, params);
    if let Some(counts) = &args.worker_counts {
        harness = harness.with_worker_counts(parse_worker_counts(counts)?);
    }

    println!(
        "--- Starting Scaling Analysis (STEP={}) ---",
        args.grid.step
    );
    println!(
        "System detected {} CPU cores.\n",
        scaling::available_cores()
    );

    let result = harness.run()?;
    for trial in &result.trials {
        match &trial.status {
            scaling::TrialStatus::Completed => println!(
                "workers={:>3}  time={:.2}s",
                trial.worker_count, trial.elapsed_seconds
            ),
            scaling::TrialStatus::Failed { reason } => println!(
                "workers={:>3}  FAILED after {:.2}s: {}",
                trial.worker_count, trial.elapsed_seconds, reason
            ),
        }
    }
    for (workers, speedup) in result.speedups() {
        info!(workers, speedup, "speedup");
    }

    if let Some(csv) = &args.csv {
        let saved = io::write_scaling_csv(&result, csv)?;
        println!("Series saved as '{}'", saved.display());
    }
    if let Some(plot) = &args.plot {
        let title = format!(
            "Scaling Analysis: Performance vs. Parallel Workers (Grid Resolution: {})",
            args.grid.step
        );
        let saved = render::render_scaling(&result, &title, plot, None)?;
        println!("Plot saved as '{}'", saved.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "densegrid=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Evaluate(args) => run_evaluate(args),
        Command::Scale(args) => run_scale(args),
    }
}
