//! Raster drawing primitives on top of `image::RgbImage`

use crate::error::ForageError;
use crate::geometry::{Bounds, Point};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const GREY: Rgb<u8> = Rgb([150, 150, 150]);
pub const LIGHT_GREY: Rgb<u8> = Rgb([225, 225, 225]);

/// Endpoints are clamped to this many pixels before rasterising a line
const LINE_LIMIT: f64 = 10_000.0;

pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, WHITE),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.image.get_pixel(x, y)
    }

    /// Set one pixel; out-of-bounds writes are ignored
    pub fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && x < self.width() as i64 && y < self.height() as i64 {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Inclusive pixel rectangle
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        let max_x = self.width() as i64 - 1;
        let max_y = self.height() as i64 - 1;
        let (left, right) = (x0.min(x1).max(0), x0.max(x1).min(max_x));
        let (top, bottom) = (y0.min(y1).max(0), y0.max(y1).min(max_y));

        for y in top..=bottom {
            for x in left..=right {
                self.image.put_pixel(x as u32, y as u32, color);
            }
        }
    }

    pub fn stroke_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];
        for i in 0..4 {
            let (a, b) = (corners[i], corners[(i + 1) % 4]);
            self.draw_line((a.0 as f64, a.1 as f64), (b.0 as f64, b.1 as f64), color);
        }
    }

    /// Bresenham line between two pixel positions
    pub fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
        if ![from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite()) {
            return;
        }
        let snap = |v: f64| v.clamp(-LINE_LIMIT, LINE_LIMIT).round() as i64;
        let (mut x, mut y) = (snap(from.0), snap(from.1));
        let (x1, y1) = (snap(to.0), snap(to.1));

        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.put(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Even-odd scanline fill sampled at pixel centres
    pub fn fill_polygon(&mut self, points: &[(f64, f64)], color: Rgb<u8>) {
        if points.len() < 3 || !points.iter().all(|(x, y)| x.is_finite() && y.is_finite()) {
            return;
        }

        let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        let first_row = (min_y.floor() as i64).max(0);
        let last_row = (max_y.ceil() as i64).min(self.height() as i64 - 1);

        let mut crossings: Vec<f64> = Vec::with_capacity(points.len());
        for row in first_row..=last_row {
            let sample_y = row as f64 + 0.5;
            crossings.clear();

            for i in 0..points.len() {
                let p = points[i];
                let q = points[(i + 1) % points.len()];
                if (p.1 <= sample_y) != (q.1 <= sample_y) {
                    crossings.push(p.0 + (sample_y - p.1) * (q.0 - p.0) / (q.1 - p.1));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));

            for span in crossings.chunks_exact(2) {
                let start = (span[0] - 0.5).ceil() as i64;
                let end = (span[1] - 0.5).floor() as i64;
                if start <= end {
                    self.fill_rect(start, row, end, row, color);
                }
            }
        }
    }

    pub fn outline_polygon(&mut self, points: &[(f64, f64)], color: Rgb<u8>) {
        for i in 0..points.len() {
            self.draw_line(points[i], points[(i + 1) % points.len()], color);
        }
    }

    pub fn fill_dot(&mut self, center: (f64, f64), radius: i64, color: Rgb<u8>) {
        if !(center.0.is_finite() && center.1.is_finite()) {
            return;
        }
        let (cx, cy) = (center.0.round() as i64, center.1.round() as i64);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ForageError> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| ForageError::Render(e.to_string()))?;
        Ok(bytes)
    }
}

/// Rectangular plotting area mapping world coordinates to pixels (y up)
#[derive(Debug, Clone, Copy)]
pub struct Panel {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub world: Bounds,
}

impl Panel {
    pub fn new(left: f64, top: f64, width: f64, height: f64, world: Bounds) -> Self {
        Self {
            left,
            top,
            width,
            height,
            world: non_degenerate(world),
        }
    }

    /// Largest panel inside the box with the world's aspect ratio, centred
    pub fn fit(left: f64, top: f64, width: f64, height: f64, world: Bounds) -> Self {
        let world = non_degenerate(world);
        let scale = (width / world.width()).min(height / world.height());
        let w = world.width() * scale;
        let h = world.height() * scale;
        Self::new(left + (width - w) / 2.0, top + (height - h) / 2.0, w, h, world)
    }

    pub fn to_pixel(&self, p: Point) -> (f64, f64) {
        let x = self.left + (p.x - self.world.min_x) / self.world.width() * self.width;
        let y = self.top + self.height - (p.y - self.world.min_y) / self.world.height() * self.height;
        (x, y)
    }

    pub fn frame(&self, canvas: &mut Canvas, color: Rgb<u8>) {
        canvas.stroke_rect(
            self.left.round() as i64,
            self.top.round() as i64,
            (self.left + self.width).round() as i64,
            (self.top + self.height).round() as i64,
            color,
        );
    }
}

fn non_degenerate(mut world: Bounds) -> Bounds {
    if !(world.width() > 0.0) {
        world.min_x -= 0.5;
        world.max_x += 0.5;
    }
    if !(world.height() > 0.0) {
        world.min_y -= 0.5;
        world.max_y += 0.5;
    }
    world
}

/// Bounds of finite data values, padded by 5% on each side
pub fn data_bounds(xs: &[f64], ys: &[f64]) -> Bounds {
    let extent = |values: &[f64]| {
        values
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    };
    let (mut min_x, mut max_x) = extent(xs);
    let (mut min_y, mut max_y) = extent(ys);
    if min_x > max_x {
        (min_x, max_x) = (0.0, 1.0);
    }
    if min_y > max_y {
        (min_y, max_y) = (0.0, 1.0);
    }

    let pad_x = (max_x - min_x) * 0.05;
    let pad_y = (max_y - min_y) * 0.05;
    Bounds {
        min_x: min_x - pad_x,
        min_y: min_y - pad_y,
        max_x: max_x + pad_x,
        max_y: max_y + pad_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_polygon_covers_interior() {
        let mut canvas = Canvas::new(20, 20);
        let red = Rgb([255, 0, 0]);
        canvas.fill_polygon(&[(2.0, 2.0), (18.0, 2.0), (18.0, 18.0), (2.0, 18.0)], red);
        assert_eq!(canvas.pixel(10, 10), red);
        assert_eq!(canvas.pixel(0, 0), WHITE);
        assert_eq!(canvas.pixel(19, 19), WHITE);
    }

    #[test]
    fn test_line_endpoints_drawn() {
        let mut canvas = Canvas::new(10, 10);
        canvas.draw_line((1.0, 1.0), (8.0, 5.0), BLACK);
        assert_eq!(canvas.pixel(1, 1), BLACK);
        assert_eq!(canvas.pixel(8, 5), BLACK);
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut canvas = Canvas::new(5, 5);
        canvas.fill_rect(-10, -10, 100, 100, BLACK);
        canvas.draw_line((-50.0, 2.0), (50.0, 2.0), GREY);
        assert_eq!(canvas.pixel(4, 4), BLACK);
        assert_eq!(canvas.pixel(0, 2), GREY);
    }

    #[test]
    fn test_panel_maps_y_up() {
        let world = Bounds { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 10.0 };
        let panel = Panel::new(0.0, 0.0, 100.0, 100.0, world);
        assert_eq!(panel.to_pixel(Point::new(0.0, 0.0)), (0.0, 100.0));
        assert_eq!(panel.to_pixel(Point::new(10.0, 10.0)), (100.0, 0.0));
    }

    #[test]
    fn test_png_signature() {
        let bytes = Canvas::new(4, 4).encode_png().unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
