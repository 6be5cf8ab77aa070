//! Geometry Provider
//!
//! Produces the sub-lots a run analyses, either synthesized on a regular
//! grid or cut from a supplied paddock boundary.
//!
//! Grid layout for both paths: `cols = ceil(sqrt(N))`, `rows = ceil(N / cols)`.
//! Uploaded boundaries are split by clipping the polygon against each grid
//! cell of its bounding box; cells that miss the polygon are dropped, so a
//! division may yield fewer than N sub-lots.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Nominal area of a synthesized sub-lot (ha)
pub const NOMINAL_SUBLOT_AREA_HA: f64 = 0.8;

/// Relative standard deviation of synthesized sub-lot areas
const AREA_NOISE_SD: f64 = 0.05;

/// m² per degree² applied to geographic coordinates.
///
/// Planar approximation carried over from the original dashboard.
pub const GEOGRAPHIC_M2_PER_DEG2: f64 = 1e10;

const M2_PER_HA: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Coordinate interpretation for area computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Planar metres
    Projected,
    /// Longitude / latitude degrees
    Geographic,
}

impl CoordinateSystem {
    /// Geographic when every point fits in lon/lat bounds
    pub fn detect(points: &[Point]) -> Self {
        let geographic = !points.is_empty()
            && points
                .iter()
                .all(|p| p.x.abs() <= 180.0 && p.y.abs() <= 90.0);
        if geographic {
            CoordinateSystem::Geographic
        } else {
            CoordinateSystem::Projected
        }
    }

    fn m2_per_unit2(&self) -> f64 {
        match self {
            CoordinateSystem::Projected => 1.0,
            CoordinateSystem::Geographic => GEOGRAPHIC_M2_PER_DEG2,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Union of two boxes
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Simple polygon stored as an open ring (last point != first point)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub ring: Vec<Point>,
}

impl Polygon {
    /// Build from a ring, dropping a closing duplicate of the first point
    pub fn new(mut ring: Vec<Point>) -> Self {
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        Self { ring }
    }

    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(vec![
            Point::new(min_x, min_y),
            Point::new(max_x, min_y),
            Point::new(max_x, max_y),
            Point::new(min_x, max_y),
        ])
    }

    /// Shoelace area in squared coordinate units
    pub fn planar_area(&self) -> f64 {
        signed_area(&self.ring).abs()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.len() < 3 || self.planar_area() <= 0.0
    }

    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for p in &self.ring {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        bounds
    }

    /// Area centroid, falling back to the vertex mean for degenerate rings
    pub fn centroid(&self) -> Point {
        let a = signed_area(&self.ring);
        let n = self.ring.len();
        if n == 0 {
            return Point::new(0.0, 0.0);
        }
        if a.abs() < f64::EPSILON {
            let sx: f64 = self.ring.iter().map(|p| p.x).sum();
            let sy: f64 = self.ring.iter().map(|p| p.y).sum();
            return Point::new(sx / n as f64, sy / n as f64);
        }

        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let p = self.ring[i];
            let q = self.ring[(i + 1) % n];
            let cross = p.x * q.y - q.x * p.y;
            cx += (p.x + q.x) * cross;
            cy += (p.y + q.y) * cross;
        }
        Point::new(cx / (6.0 * a), cy / (6.0 * a))
    }

    /// Intersection with an axis-aligned rectangle (Sutherland-Hodgman)
    pub fn clip_to_rect(&self, rect: &Bounds) -> Polygon {
        let mut current: SmallVec<[Point; 8]> = self.ring.iter().copied().collect();

        for edge in [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top] {
            if current.is_empty() {
                break;
            }
            let input = std::mem::take(&mut current);
            let n = input.len();
            for i in 0..n {
                let p = input[i];
                let prev = input[(i + n - 1) % n];
                let p_in = edge.contains(&p, rect);
                let prev_in = edge.contains(&prev, rect);
                if p_in {
                    if !prev_in {
                        current.push(edge.intersect(&prev, &p, rect));
                    }
                    current.push(p);
                } else if prev_in {
                    current.push(edge.intersect(&prev, &p, rect));
                }
            }
        }

        Polygon::new(current.into_vec())
    }
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    fn contains(&self, p: &Point, r: &Bounds) -> bool {
        match self {
            Edge::Left => p.x >= r.min_x,
            Edge::Right => p.x <= r.max_x,
            Edge::Bottom => p.y >= r.min_y,
            Edge::Top => p.y <= r.max_y,
        }
    }

    fn intersect(&self, a: &Point, b: &Point, r: &Bounds) -> Point {
        match self {
            Edge::Left | Edge::Right => {
                let x = if matches!(self, Edge::Left) { r.min_x } else { r.max_x };
                let t = (x - a.x) / (b.x - a.x);
                Point::new(x, a.y + t * (b.y - a.y))
            }
            Edge::Bottom | Edge::Top => {
                let y = if matches!(self, Edge::Bottom) { r.min_y } else { r.max_y };
                let t = (y - a.y) / (b.y - a.y);
                Point::new(a.x + t * (b.x - a.x), y)
            }
        }
    }
}

fn signed_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let p = ring[i];
        let q = ring[(i + 1) % n];
        sum += p.x * q.y - q.x * p.y;
    }
    sum / 2.0
}

/// One grid cell of the divided paddock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubLot {
    /// 1-based, unique within a run
    pub id: u32,
    pub area_ha: f64,
    pub centroid: Point,
    pub polygon: Option<Polygon>,
}

impl SubLot {
    /// Short text form used in the exported table
    pub fn geometry_summary(&self) -> String {
        match &self.polygon {
            Some(polygon) => format!(
                "POLYGON({} pts, centroid {:.5} {:.5})",
                polygon.ring.len(),
                self.centroid.x,
                self.centroid.y
            ),
            None => format!("POINT({:.5} {:.5})", self.centroid.x, self.centroid.y),
        }
    }
}

/// Grid shape for N sub-lots: (rows, cols)
pub fn grid_shape(n: usize) -> (usize, usize) {
    let n = n.max(1);
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);
    (rows, cols)
}

/// Area of a polygon in hectares
pub fn area_ha(polygon: &Polygon, crs: CoordinateSystem) -> f64 {
    polygon.planar_area() * crs.m2_per_unit2() / M2_PER_HA
}

/// Synthesize exactly `n` sub-lots on a square grid of nominal 0.8 ha cells
pub fn synthesize_grid<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<SubLot> {
    let (_, cols) = grid_shape(n);
    let side = (NOMINAL_SUBLOT_AREA_HA * M2_PER_HA).sqrt();

    (0..n)
        .map(|i| {
            let row = (i / cols) as f64;
            let col = (i % cols) as f64;
            let polygon = Polygon::rectangle(
                col * side,
                row * side,
                (col + 1.0) * side,
                (row + 1.0) * side,
            );
            let z: f64 = rng.sample(StandardNormal);
            let area = (NOMINAL_SUBLOT_AREA_HA * (1.0 + AREA_NOISE_SD * z)).clamp(0.5, 1.1);

            SubLot {
                id: i as u32 + 1,
                area_ha: area,
                centroid: polygon.centroid(),
                polygon: Some(polygon),
            }
        })
        .collect()
}

/// Split a paddock boundary into at most `n` sub-lots.
///
/// Cells are visited row by row from the bounding-box origin and division
/// stops once `n` non-empty intersections have been kept. When no cell
/// intersects, the undivided paddock is returned as a single sub-lot.
pub fn divide_polygon(paddock: &Polygon, n: usize, crs: CoordinateSystem) -> Vec<SubLot> {
    let (rows, cols) = grid_shape(n);
    let bounds = paddock.bounds();
    let width = bounds.width() / cols as f64;
    let height = bounds.height() / rows as f64;

    let mut sublots = Vec::with_capacity(n);

    'rows: for i in 0..rows {
        for j in 0..cols {
            if sublots.len() >= n {
                break 'rows;
            }

            let cell = Bounds {
                min_x: bounds.min_x + j as f64 * width,
                max_x: bounds.min_x + (j + 1) as f64 * width,
                min_y: bounds.min_y + i as f64 * height,
                max_y: bounds.min_y + (i + 1) as f64 * height,
            };

            let piece = paddock.clip_to_rect(&cell);
            if piece.is_empty() {
                continue;
            }

            sublots.push(SubLot {
                id: sublots.len() as u32 + 1,
                area_ha: area_ha(&piece, crs),
                centroid: piece.centroid(),
                polygon: Some(piece),
            });
        }
    }

    if sublots.is_empty() {
        tracing::warn!("No grid cell intersects the paddock; keeping it undivided");
        sublots.push(SubLot {
            id: 1,
            area_ha: area_ha(paddock, crs),
            centroid: paddock.centroid(),
            polygon: Some(paddock.clone()),
        });
    }

    sublots
}
