//! Choropleth maps of the divided paddock

use super::canvas::{Canvas, Panel, BLACK, GREY, LIGHT_GREY};
use super::colormap::{productivity_color, residency_color, surface_color};
use crate::error::ForageError;
use crate::geometry::{Bounds, Polygon};
use crate::metrics::biomass::AVAILABLE_RANGE;
use crate::metrics::livestock::MAX_RESIDENCY_DAYS;
use crate::metrics::{EnrichedSubLot, SurfaceType};
use image::Rgb;

const WIDTH: u32 = 900;
const HEIGHT: u32 = 800;
const MARGIN: f64 = 30.0;
const MAP_SIZE: f64 = 740.0;
const LEGEND_LEFT: i64 = 800;
const LEGEND_WIDTH: i64 = 30;

/// Polygon to draw for a sub-lot; a square of its area when it has none
fn footprint(row: &EnrichedSubLot) -> Polygon {
    match &row.sublot.polygon {
        Some(polygon) if !polygon.is_empty() => polygon.clone(),
        _ => {
            let half = (row.sublot.area_ha * 10_000.0).sqrt() / 2.0;
            let c = row.sublot.centroid;
            Polygon::rectangle(c.x - half, c.y - half, c.x + half, c.y + half)
        }
    }
}

fn map_panel(shapes: &[Polygon]) -> Panel {
    let world = shapes
        .iter()
        .map(Polygon::bounds)
        .reduce(|a, b| a.union(&b))
        .unwrap_or(Bounds { min_x: 0.0, min_y: 0.0, max_x: 1.0, max_y: 1.0 });
    Panel::fit(MARGIN, MARGIN, MAP_SIZE, MAP_SIZE, world)
}

fn pixel_ring(panel: &Panel, polygon: &Polygon) -> Vec<(f64, f64)> {
    polygon.ring.iter().map(|p| panel.to_pixel(*p)).collect()
}

/// Draw every sub-lot filled with `fill` and outlined with `outline`
fn draw_map<F, O>(rows: &[EnrichedSubLot], fill: F, outline: O) -> Canvas
where
    F: Fn(&EnrichedSubLot) -> Rgb<u8>,
    O: Fn(&EnrichedSubLot) -> Rgb<u8>,
{
    let shapes: Vec<Polygon> = rows.iter().map(footprint).collect();
    let panel = map_panel(&shapes);
    let mut canvas = Canvas::new(WIDTH, HEIGHT);

    for (row, shape) in rows.iter().zip(&shapes) {
        canvas.fill_polygon(&pixel_ring(&panel, shape), fill(row));
    }
    // Outlines after fills so shared edges are not painted over
    for (row, shape) in rows.iter().zip(&shapes) {
        canvas.outline_polygon(&pixel_ring(&panel, shape), outline(row));
    }
    canvas
}

/// Vertical colour bar, maximum at the top
fn draw_color_bar(canvas: &mut Canvas, color_at: impl Fn(f64) -> Rgb<u8>) {
    let top = MARGIN as i64;
    let bottom = (MARGIN + MAP_SIZE) as i64;
    for y in top..=bottom {
        let t = (bottom - y) as f64 / (bottom - top) as f64;
        canvas.fill_rect(LEGEND_LEFT, y, LEGEND_LEFT + LEGEND_WIDTH, y, color_at(t));
    }
    canvas.stroke_rect(LEGEND_LEFT, top, LEGEND_LEFT + LEGEND_WIDTH, bottom, GREY);
}

fn ensure_rows(rows: &[EnrichedSubLot], artifact: &str) -> Result<(), ForageError> {
    if rows.is_empty() {
        return Err(ForageError::Render(format!("{}: no sub-lots to draw", artifact)));
    }
    Ok(())
}

/// Available biomass on a fixed 0-1200 kg/ha scale
pub fn render_productivity_map(rows: &[EnrichedSubLot]) -> Result<Vec<u8>, ForageError> {
    ensure_rows(rows, "productivity map")?;
    let mut canvas = draw_map(
        rows,
        |r| productivity_color(r.biomass.available_biomass_kg_ha),
        |_| GREY,
    );
    draw_color_bar(&mut canvas, |t| productivity_color(t * AVAILABLE_RANGE.1));
    canvas.encode_png()
}

/// Residency days on a fixed 0-10 scale
pub fn render_residency_map(rows: &[EnrichedSubLot]) -> Result<Vec<u8>, ForageError> {
    ensure_rows(rows, "residency map")?;
    let mut canvas = draw_map(
        rows,
        |r| residency_color(r.livestock.residency_days),
        |_| GREY,
    );
    draw_color_bar(&mut canvas, |t| residency_color(t * MAX_RESIDENCY_DAYS));
    canvas.encode_png()
}

/// Surface types in four fixed colours; vegetated sub-lots outlined in black
pub fn render_surface_map(rows: &[EnrichedSubLot]) -> Result<Vec<u8>, ForageError> {
    ensure_rows(rows, "surface type map")?;
    let mut canvas = draw_map(
        rows,
        |r| surface_color(r.vegetation.surface_type),
        |r| if r.vegetation.has_vegetation { BLACK } else { GREY },
    );

    // Legend swatches, bare soil at the bottom
    let swatch = 40;
    for (i, surface_type) in SurfaceType::ALL.iter().rev().enumerate() {
        let top = MARGIN as i64 + i as i64 * (swatch + 10);
        canvas.fill_rect(LEGEND_LEFT, top, LEGEND_LEFT + LEGEND_WIDTH, top + swatch, surface_color(*surface_type));
        canvas.stroke_rect(LEGEND_LEFT, top, LEGEND_LEFT + LEGEND_WIDTH, top + swatch, LIGHT_GREY);
    }
    canvas.encode_png()
}
