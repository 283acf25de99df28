//! Common types used throughout store_navigation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 2D point in continuous floor-plan coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

/// Path represented as a sequence of 2D points
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path2D {
    pub points: Vec<Point2D>,
}

impl Path2D {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    pub fn total_length(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.points.windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }
}

/// Cell of the occupancy grid, addressed as (row, col) = (y, x)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

impl GridCell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance, the admissible heuristic for 4-connected unit-cost moves
    pub fn manhattan(&self, other: &GridCell) -> u32 {
        (self.row.abs_diff(other.row) + self.col.abs_diff(other.col)) as u32
    }

    pub fn is_adjacent(&self, other: &GridCell) -> bool {
        self.manhattan(other) == 1
    }
}

/// Result of one grid search between two cells
#[derive(Debug, Clone, PartialEq)]
pub struct GridPath {
    /// Cells from the resolved start to the resolved goal, both inclusive
    pub cells: Vec<GridCell>,
    /// Number of cells expanded by the search
    pub expanded: usize,
}

impl GridPath {
    pub fn start(&self) -> Option<GridCell> {
        self.cells.first().copied()
    }

    pub fn goal(&self) -> Option<GridCell> {
        self.cells.last().copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of unit moves along the path
    pub fn step_cost(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }
}

/// Axis-aligned rectangle given by two opposite corners in any order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Corners reordered so that `x1 <= x2` and `y1 <= y2`
    pub fn normalized(&self) -> Rect {
        Rect {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    pub fn center(&self) -> Point2D {
        Point2D::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Project `p` onto the long axis centre line of this rectangle.
    ///
    /// Wide rectangles (aisles running along x) keep `p.x` and take the centre y,
    /// tall ones keep `p.y` and take the centre x.
    pub fn snap_to_centerline(&self, p: &Point2D) -> Point2D {
        let c = self.center();
        if self.width() >= self.height() {
            Point2D::new(p.x, c.y)
        } else {
            Point2D::new(c.x, p.y)
        }
    }

    /// Closed outline, used for plotting
    pub fn outline(&self) -> Vec<Point2D> {
        let r = self.normalized();
        vec![
            Point2D::new(r.x1, r.y1),
            Point2D::new(r.x2, r.y1),
            Point2D::new(r.x2, r.y2),
            Point2D::new(r.x1, r.y2),
            Point2D::new(r.x1, r.y1),
        ]
    }
}

/// Store section or shelving unit that blocks movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleRect {
    pub id: u64,
    #[serde(flatten)]
    pub rect: Rect,
    #[serde(default)]
    pub floor_level: Option<i32>,
}

impl ObstacleRect {
    pub fn new(id: u64, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { id, rect: Rect::new(x1, y1, x2, y2), floor_level: None }
    }

    pub fn on_floor(mut self, floor_level: i32) -> Self {
        self.floor_level = Some(floor_level);
        self
    }

    /// Obstacles without a floor level apply to every floor
    pub fn applies_to(&self, floor_level: Option<i32>) -> bool {
        match (floor_level, self.floor_level) {
            (Some(wanted), Some(own)) => wanted == own,
            _ => true,
        }
    }
}

/// Item location to visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub item_id: u64,
    pub x: f64,
    pub y: f64,
    pub section_id: u64,
}

impl Waypoint {
    pub fn new(item_id: u64, x: f64, y: f64, section_id: u64) -> Self {
        Self { item_id, x, y, section_id }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Reported shopper/cart position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartPosition {
    pub x: f64,
    pub y: f64,
    pub timestamp: DateTime<Utc>,
}

impl CartPosition {
    pub fn new(x: f64, y: f64, timestamp: DateTime<Utc>) -> Self {
        Self { x, y, timestamp }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Most recent report by timestamp
    pub fn latest(history: &[CartPosition]) -> Option<&CartPosition> {
        history.iter().max_by_key(|p| p.timestamp)
    }
}
