//! Geometry helpers for vector_tools
//!
//! A minimal planar geometry model with vertex extraction and a nearest
//! neighbour distance check.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// File extensions of formats that carry no geometry
pub const NO_GEOMETRY_EXTENSIONS: &[&str] = &["csv", "dbf", "ods", "xlsx"];

/// A planar point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point
    pub fn sqr_dist(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// A ring or line as an ordered vertex list
pub type Polyline = Vec<Point>;

/// A polygon as its rings, exterior first
pub type Polygon = Vec<Polyline>;

/// Single or multi-part geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Point),
    MultiPoint(Vec<Point>),
    LineString(Polyline),
    MultiLineString(Vec<Polyline>),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    pub fn is_multipart(&self) -> bool {
        matches!(
            self,
            Geometry::MultiPoint(_) | Geometry::MultiLineString(_) | Geometry::MultiPolygon(_)
        )
    }
}

/// Every vertex of the geometry in storage order, including all polygon rings
pub fn extract_points(geometry: &Geometry) -> Vec<Point> {
    match geometry {
        Geometry::Point(point) => vec![*point],
        Geometry::MultiPoint(points) => points.clone(),
        Geometry::LineString(line) => line.clone(),
        Geometry::MultiLineString(lines) => lines.iter().flatten().copied().collect(),
        Geometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
        Geometry::MultiPolygon(polygons) => polygons
            .iter()
            .flat_map(|rings| rings.iter().flatten())
            .copied()
            .collect(),
    }
}

/// Nearest neighbour lookup over point ids
pub trait SpatialIndex {
    /// Ids of up to `count` points nearest to `point`
    fn nearest_neighbors(&self, point: &Point, count: usize) -> Vec<i64>;
}

/// Whether `point` is at least `distance` away from its nearest indexed
/// neighbour. A zero distance, an empty index or a neighbour missing from
/// `points` all pass.
pub fn check_min_distance<I: SpatialIndex + ?Sized>(
    point: &Point,
    index: &I,
    distance: f64,
    points: &HashMap<i64, Point>,
) -> bool {
    if distance == 0.0 {
        return true;
    }

    let neighbors = index.nearest_neighbors(point, 1);
    let Some(nearest) = neighbors.first() else {
        return true;
    };

    match points.get(nearest) {
        Some(neighbor) => neighbor.sqr_dist(point) >= distance * distance,
        None => true,
    }
}
