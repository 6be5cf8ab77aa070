//! Diagnostic figures: correlation heatmap with scatter panels, and the
//! four-panel regression diagnostics.

use super::canvas::{data_bounds, Canvas, Panel, GREY, LIGHT_GREY};
use super::colormap::{correlation_color, FIT_LINE, NEGATIVE_BAR, POINT, POSITIVE_BAR};
use crate::error::ForageError;
use crate::geometry::{Bounds, Point};
use crate::stats::{CorrelationAnalysis, RegressionSummary, ScatterFit};

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 840;
const PANEL_WIDTH: f64 = 520.0;
const PANEL_HEIGHT: f64 = 360.0;
const HISTOGRAM_BINS: usize = 10;

/// 2x2 grid slot (0 = top-left, row-major)
fn slot(index: usize, world: Bounds) -> Panel {
    let left = 40.0 + (index % 2) as f64 * 600.0;
    let top = 40.0 + (index / 2) as f64 * 400.0;
    Panel::new(left, top, PANEL_WIDTH, PANEL_HEIGHT, world)
}

fn draw_points(canvas: &mut Canvas, panel: &Panel, xs: &[f64], ys: &[f64]) {
    for (x, y) in xs.iter().zip(ys) {
        canvas.fill_dot(panel.to_pixel(Point::new(*x, *y)), 3, POINT);
    }
}

/// `y = slope * x + intercept` across the panel's x range
fn draw_fit_line(canvas: &mut Canvas, panel: &Panel, slope: f64, intercept: f64, color: image::Rgb<u8>) {
    let (x0, x1) = (panel.world.min_x, panel.world.max_x);
    canvas.draw_line(
        panel.to_pixel(Point::new(x0, slope * x0 + intercept)),
        panel.to_pixel(Point::new(x1, slope * x1 + intercept)),
        color,
    );
}

fn draw_heatmap(canvas: &mut Canvas, analysis: &CorrelationAnalysis) {
    let k = analysis.matrix.variables.len();
    let side = PANEL_WIDTH.min(PANEL_HEIGHT);
    let cell = side / k as f64;
    let (left, top) = (40.0, 40.0);

    for (i, row) in analysis.matrix.values.iter().enumerate() {
        for (j, r) in row.iter().enumerate() {
            let x0 = (left + j as f64 * cell).round() as i64;
            let y0 = (top + i as f64 * cell).round() as i64;
            let x1 = (left + (j + 1) as f64 * cell).round() as i64 - 1;
            let y1 = (top + (i + 1) as f64 * cell).round() as i64 - 1;
            canvas.fill_rect(x0, y0, x1, y1, correlation_color(*r));
            canvas.stroke_rect(x0, y0, x1, y1, LIGHT_GREY);
        }
    }
}

fn draw_scatter(canvas: &mut Canvas, index: usize, fit: &ScatterFit) {
    let panel = slot(index, data_bounds(&fit.x, &fit.y));
    panel.frame(canvas, GREY);
    draw_points(canvas, &panel, &fit.x, &fit.y);
    draw_fit_line(canvas, &panel, fit.slope, fit.intercept, FIT_LINE);
}

/// Heatmap (top-left) plus the three scatter/fit panels
pub fn render_correlation_figure(analysis: &CorrelationAnalysis) -> Result<Vec<u8>, ForageError> {
    let has_points = analysis.fits.iter().any(|f| !f.x.is_empty());
    if analysis.matrix.variables.is_empty() || !has_points {
        return Err(ForageError::Render(
            "correlation figure: table has no rows".to_string(),
        ));
    }

    let mut canvas = Canvas::new(WIDTH, HEIGHT);
    draw_heatmap(&mut canvas, analysis);
    for (i, fit) in analysis.fits.iter().take(3).enumerate() {
        draw_scatter(&mut canvas, i + 1, fit);
    }
    canvas.encode_png()
}

/// Bin counts over [min, max]; a constant series lands in the middle bin
pub fn histogram(values: &[f64], bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return counts;
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    for v in finite {
        let index = if max > min {
            (((v - min) / (max - min)) * bins as f64).floor() as usize
        } else {
            bins / 2
        };
        counts[index.min(bins - 1)] += 1;
    }
    counts
}

fn draw_bars(canvas: &mut Canvas, panel: &Panel, values: &[f64], colored: bool) {
    let n = values.len().max(1) as f64;
    let slot_width = panel.world.width() / n;
    for (i, v) in values.iter().enumerate() {
        let x0 = panel.world.min_x + (i as f64 + 0.1) * slot_width;
        let x1 = panel.world.min_x + (i as f64 + 0.9) * slot_width;
        let (a, b) = (panel.to_pixel(Point::new(x0, 0.0)), panel.to_pixel(Point::new(x1, *v)));
        let color = match (colored, *v >= 0.0) {
            (false, _) => POINT,
            (true, true) => POSITIVE_BAR,
            (true, false) => NEGATIVE_BAR,
        };
        canvas.fill_rect(a.0.round() as i64, a.1.round() as i64, b.0.round() as i64, b.1.round() as i64, color);
    }
}

/// Actual vs predicted, residuals, standardized coefficients and residual histogram
pub fn render_regression_figure(summary: &RegressionSummary) -> Result<Vec<u8>, ForageError> {
    if summary.actual.is_empty() {
        return Err(ForageError::Render(
            "regression figure: no fitted observations".to_string(),
        ));
    }

    let residuals = summary.residuals();
    let mut canvas = Canvas::new(WIDTH, HEIGHT);

    // Actual vs predicted with the identity line
    let combined: Vec<f64> = summary.actual.iter().chain(&summary.fitted).copied().collect();
    let square = data_bounds(&combined, &combined);
    let panel = slot(0, square);
    panel.frame(&mut canvas, GREY);
    draw_fit_line(&mut canvas, &panel, 1.0, 0.0, GREY);
    draw_points(&mut canvas, &panel, &summary.fitted, &summary.actual);

    // Residuals vs predicted with the zero line
    let panel = slot(1, data_bounds(&summary.fitted, &residuals));
    panel.frame(&mut canvas, GREY);
    draw_fit_line(&mut canvas, &panel, 0.0, 0.0, FIT_LINE);
    draw_points(&mut canvas, &panel, &summary.fitted, &residuals);

    // Standardized coefficients
    let coefs = &summary.standardized_coefficients;
    let peak = coefs.iter().fold(0.0_f64, |m, c| m.max(c.abs())).max(1e-9);
    let panel = slot(
        2,
        Bounds { min_x: 0.0, min_y: -peak * 1.1, max_x: 1.0, max_y: peak * 1.1 },
    );
    panel.frame(&mut canvas, GREY);
    draw_bars(&mut canvas, &panel, coefs, true);
    draw_fit_line(&mut canvas, &panel, 0.0, 0.0, GREY);

    // Residual histogram
    let counts: Vec<f64> = histogram(&residuals, HISTOGRAM_BINS)
        .into_iter()
        .map(|c| c as f64)
        .collect();
    let tallest = counts.iter().copied().fold(1.0_f64, f64::max);
    let panel = slot(3, Bounds { min_x: 0.0, min_y: 0.0, max_x: 1.0, max_y: tallest * 1.1 });
    panel.frame(&mut canvas, GREY);
    draw_bars(&mut canvas, &panel, &counts, false);

    canvas.encode_png()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{analyze_correlations, fit_multiple_regression};

    fn table() -> polars::prelude::DataFrame {
        polars::df!(
            "available_biomass_kg_ha" => [10.0, 120.0, 300.0, 45.0, 600.0, 80.0],
            "units_per_ha" => [0.01, 0.2, 0.5, 0.05, 1.1, 0.12],
            "residency_days" => [0.1, 1.0, 2.5, 0.3, 5.0, 0.7],
            "ndvi" => [0.1, 0.3, 0.5, 0.12, 0.62, 0.2],
            "cover" => [0.1, 0.4, 0.6, 0.08, 0.8, 0.3],
            "area_ha" => [0.8, 0.75, 0.83, 0.79, 0.81, 0.77],
        )
        .unwrap()
    }

    #[test]
    fn test_histogram_counts_every_value() {
        let counts = histogram(&[0.0, 0.1, 0.5, 0.9, 1.0], 10);
        assert_eq!(counts.iter().sum::<usize>(), 5);
        assert_eq!(counts[0], 1);
        assert_eq!(counts[9], 2);

        let flat = histogram(&[2.0, 2.0, 2.0], 10);
        assert_eq!(flat[5], 3);
    }

    #[test]
    fn test_figures_encode_png() {
        let df = table();
        let analysis = analyze_correlations(&df).unwrap();
        let bytes = render_correlation_figure(&analysis).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");

        let summary = fit_multiple_regression(
            &df,
            "units_per_ha",
            &["available_biomass_kg_ha", "ndvi", "cover", "area_ha"],
        )
        .unwrap();
        let bytes = render_regression_figure(&summary).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_empty_table_is_render_error() {
        let empty = polars::df!(
            "available_biomass_kg_ha" => Vec::<f64>::new(),
            "units_per_ha" => Vec::<f64>::new(),
            "residency_days" => Vec::<f64>::new(),
            "ndvi" => Vec::<f64>::new(),
            "cover" => Vec::<f64>::new(),
            "area_ha" => Vec::<f64>::new(),
        )
        .unwrap();
        let analysis = analyze_correlations(&empty).unwrap();
        assert!(matches!(
            render_correlation_figure(&analysis),
            Err(ForageError::Render(_))
        ));
    }
}
