// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! SVG figures for computed fields and scaling sweeps.
//!
//! Fields are drawn as heatmaps with y increasing upward and equal data units
//! on both axes. Large fields are downsampled by striding so the figure holds
//! at most `max_cells` cells per axis. The scaling report plots runtime
//! against worker count with a vertical marker at the detected core count.

use std::error::Error;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::info;

use crate::core::{Extent, Grid, ScalarField};
use crate::error::{FieldError, Result};
use crate::scaling::ScalingResult;

/// Figure styling.
#[derive(Clone)]
pub struct PlotConfig {
    /// Image width in pixels (default: 800)
    pub width: u32,
    /// Image height in pixels for the scaling report (default: 600).
    /// Heatmap height follows the field's aspect ratio.
    pub height: u32,
    /// Maximum heatmap cells per axis (default: 200)
    pub max_cells: usize,
    /// Background color (default: WHITE)
    pub background: RGBColor,
    /// Runtime line color (default: navy)
    pub line_color: RGBColor,
    /// Core-count marker color (default: crimson)
    pub marker_color: RGBColor,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            max_cells: 200,
            background: WHITE,
            line_color: RGBColor(0, 0, 128),
            marker_color: RGBColor(220, 20, 60),
        }
    }
}

/// Title, axis labels and data extent of a heatmap.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlotMeta {
    /// Figure title.
    pub title: String,
    /// Horizontal axis label.
    pub x_label: String,
    /// Vertical axis label.
    pub y_label: String,
    /// `(xmin, xmax, ymin, ymax)` in data units.
    pub extent: Extent,
}

impl FieldPlotMeta {
    /// Labels "X"/"Y" and a title naming the chunk bounds.
    pub fn for_grid(grid: &Grid) -> Self {
        let extent = grid.extent();
        FieldPlotMeta {
            title: format!(
                "Chunk: X[{}, {}] Y[{}, {}]",
                extent.0, extent.1, extent.2, extent.3
            ),
            x_label: "X".to_string(),
            y_label: "Y".to_string(),
            extent,
        }
    }
}

/// Map `t` in `[0, 1]` from blue (low) to red (high).
fn heat_color(t: f64) -> HSLColor {
    let t = t.clamp(0.0, 1.0);
    HSLColor(0.66 * (1.0 - t), 0.85, 0.5)
}

struct Cell {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    t: f64,
}

fn heatmap_cells(field: &ScalarField, extent: Extent, max_cells: usize) -> Vec<Cell> {
    let (nx, ny) = field.shape();
    let (xmin, xmax, ymin, ymax) = extent;
    let (lo, hi) = field.min_max().unwrap_or((0.0, 0.0));
    let span = if hi > lo { hi - lo } else { 1.0 };
    let max_cells = max_cells.max(1);
    let sx = nx.div_ceil(max_cells).max(1);
    let sy = ny.div_ceil(max_cells).max(1);
    let dx = (xmax - xmin) / nx as f64;
    let dy = (ymax - ymin) / ny as f64;

    let mut cells = Vec::with_capacity(nx.div_ceil(sx) * ny.div_ceil(sy));
    for i in (0..nx).step_by(sx) {
        for j in (0..ny).step_by(sy) {
            let v = field.get(i, j).unwrap_or(lo);
            cells.push(Cell {
                x0: xmin + i as f64 * dx,
                x1: xmin + (i + sx).min(nx) as f64 * dx,
                y0: ymin + j as f64 * dy,
                y1: ymin + (j + sy).min(ny) as f64 * dy,
                t: (v - lo) / span,
            });
        }
    }
    cells
}

fn draw_field_on_area<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    field: &ScalarField,
    meta: &FieldPlotMeta,
    config: &PlotConfig,
) -> std::result::Result<(), Box<dyn Error>>
where
    <DB as DrawingBackend>::ErrorType: 'static,
{
    let (xmin, xmax, ymin, ymax) = meta.extent;
    root.fill(&config.background)?;

    let mut chart = ChartBuilder::on(root)
        .caption(&meta.title, ("sans-serif", 24.0).into_font())
        .margin(15)
        .x_label_area_size(HEATMAP_X_LABEL_AREA)
        .y_label_area_size(HEATMAP_Y_LABEL_AREA)
        .build_cartesian_2d(xmin..xmax, ymin..ymax)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(&meta.x_label)
        .y_desc(&meta.y_label)
        .draw()?;

    // cartesian coordinates put larger y higher on the canvas
    chart.draw_series(
        heatmap_cells(field, meta.extent, config.max_cells)
            .into_iter()
            .map(|c| Rectangle::new([(c.x0, c.y0), (c.x1, c.y1)], heat_color(c.t).filled())),
    )?;

    root.present()?;
    Ok(())
}

fn draw_scaling_on_area<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    result: &ScalingResult,
    title: &str,
    config: &PlotConfig,
) -> std::result::Result<(), Box<dyn Error>>
where
    <DB as DrawingBackend>::ErrorType: 'static,
{
    let series: Vec<(f64, f64)> = result
        .series()
        .into_iter()
        .map(|(w, s)| (w as f64, s))
        .collect();
    let cores = result.physical_cores as f64;
    let max_workers = series
        .iter()
        .map(|p| p.0)
        .fold(cores, f64::max);
    let max_time = series.iter().map(|p| p.1).fold(0.0, f64::max);
    let y_max = if max_time > 0.0 { max_time * 1.1 } else { 1.0 };

    root.fill(&config.background)?;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24.0).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0.5..max_workers + 0.5, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Number of Workers")
        .y_desc("Runtime (s)")
        .draw()?;

    let line_color = config.line_color;
    chart
        .draw_series(LineSeries::new(
            series.iter().copied(),
            line_color.stroke_width(2),
        ))?
        .label("Execution Time")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_color.stroke_width(2)));
    chart.draw_series(
        series
            .iter()
            .map(|&p| Circle::new(p, 4, line_color.filled())),
    )?;

    let marker_color = config.marker_color;
    chart
        .draw_series(LineSeries::new(
            vec![(cores, 0.0), (cores, y_max)],
            marker_color.stroke_width(2),
        ))?
        .label(format!("Physical Core Limit ({})", result.physical_cores))
        .legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], marker_color.stroke_width(2))
        });

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

const HEATMAP_X_LABEL_AREA: u32 = 45;
const HEATMAP_Y_LABEL_AREA: u32 = 60;
// caption and outer margins
const HEATMAP_VERTICAL_CHROME: u32 = 15 * 2 + 40;

fn heatmap_height(extent: Extent, width: u32) -> u32 {
    let (xmin, xmax, ymin, ymax) = extent;
    let plot_width = width.saturating_sub(HEATMAP_Y_LABEL_AREA + 30).max(1) as f64;
    let plot_height = plot_width * (ymax - ymin) / (xmax - xmin);
    (plot_height.round() as u32 + HEATMAP_X_LABEL_AREA + HEATMAP_VERTICAL_CHROME).clamp(100, 8192)
}

fn render_error(path: &Path, e: impl ToString) -> FieldError {
    FieldError::OutputWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Render a field as an SVG heatmap. Returns the final path.
///
/// # Errors
/// Fails with [`FieldError::Other`] for an empty field or an extent with no
/// area, and with [`FieldError::OutputWrite`] if drawing or saving fails.
pub fn render_field(
    field: &ScalarField,
    meta: &FieldPlotMeta,
    path: &Path,
    config: Option<&PlotConfig>,
) -> Result<PathBuf> {
    let config = config.cloned().unwrap_or_default();
    let (nx, ny) = field.shape();
    let (xmin, xmax, ymin, ymax) = meta.extent;
    if nx == 0 || ny == 0 {
        return Err(FieldError::Other("cannot render an empty field".to_string()));
    }
    if !(xmax > xmin && ymax > ymin) {
        return Err(FieldError::Other(format!(
            "cannot render extent {:?}",
            meta.extent
        )));
    }

    let height = heatmap_height(meta.extent, config.width);
    {
        let root = SVGBackend::new(path, (config.width, height)).into_drawing_area();
        draw_field_on_area(&root, field, meta, &config).map_err(|e| render_error(path, e))?;
    }
    info!(path = %path.display(), "rendered field");
    Ok(path.to_path_buf())
}

/// Render runtime vs worker count as an SVG line chart. Returns the final path.
pub fn render_scaling(
    result: &ScalingResult,
    title: &str,
    path: &Path,
    config: Option<&PlotConfig>,
) -> Result<PathBuf> {
    let config = config.cloned().unwrap_or_default();
    {
        let root = SVGBackend::new(path, (config.width, config.height)).into_drawing_area();
        draw_scaling_on_area(&root, result, title, &config).map_err(|e| render_error(path, e))?;
    }
    info!(path = %path.display(), "rendered scaling report");
    Ok(path.to_path_buf())
}
