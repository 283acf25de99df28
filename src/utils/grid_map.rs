// occupancy grid built from rectangular store sections
// rows follow the y axis, columns the x axis

use log::debug;
use nalgebra as na;

use crate::common::{GridCell, NavigationError, NavigationResult, ObstacleRect, Point2D, Rect};

/// Cell budget used by `build_grid`
pub const DEFAULT_MAX_CELLS: usize = 4_000_000;

/// 4-connected neighbourhood as (d_row, d_col)
pub const NEIGHBORS_4: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

/// Immutable map of blocked (`true`) and free (`false`) cells
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    grid: na::DMatrix<bool>,
    resolution: f64,
}

impl OccupancyGrid {
    /// All-free grid of the given size
    pub fn empty(rows: usize, cols: usize, resolution: f64) -> Self {
        Self {
            grid: na::DMatrix::from_element(rows, cols, false),
            resolution,
        }
    }

    /// Grid from text rows, `#` marks a blocked cell; row 0 is the first line
    pub fn from_ascii(lines: &[&str], resolution: f64) -> Self {
        let rows = lines.len();
        let cols = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let mut grid = Self::empty(rows, cols, resolution);
        for (r, line) in lines.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                grid.grid[(r, c)] = ch == '#';
            }
        }
        grid
    }

    pub fn rows(&self) -> usize {
        self.grid.nrows()
    }

    pub fn cols(&self) -> usize {
        self.grid.ncols()
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        cell.row < self.rows() && cell.col < self.cols()
    }

    /// Out-of-bounds cells count as blocked
    pub fn is_blocked(&self, cell: GridCell) -> bool {
        !self.contains(cell) || self.grid[(cell.row, cell.col)]
    }

    pub fn is_free(&self, cell: GridCell) -> bool {
        !self.is_blocked(cell)
    }

    pub fn blocked_count(&self) -> usize {
        self.grid.iter().filter(|&&b| b).count()
    }

    /// In-bounds 4-neighbours of `cell`, blocked or not
    pub fn neighbors(&self, cell: GridCell) -> impl Iterator<Item = GridCell> + '_ {
        NEIGHBORS_4.iter().filter_map(move |&(dr, dc)| {
            let row = cell.row.checked_add_signed(dr)?;
            let col = cell.col.checked_add_signed(dc)?;
            let next = GridCell::new(row, col);
            self.contains(next).then_some(next)
        })
    }

    /// Cell containing the continuous point `p`
    pub fn cell_at(&self, p: Point2D) -> NavigationResult<GridCell> {
        let out_of_bounds = NavigationError::OutOfBounds { x: p.x, y: p.y };
        if !p.is_finite() {
            return Err(out_of_bounds);
        }
        let col = (p.x * self.resolution).floor();
        let row = (p.y * self.resolution).floor();
        if col < 0.0 || row < 0.0 || col >= self.cols() as f64 || row >= self.rows() as f64 {
            return Err(out_of_bounds);
        }
        Ok(GridCell::new(row as usize, col as usize))
    }

    /// Continuous position of a cell's lower corner
    pub fn cell_to_point(&self, cell: GridCell) -> Point2D {
        Point2D::new(
            cell.col as f64 / self.resolution,
            cell.row as f64 / self.resolution,
        )
    }

    /// Layer permanent keep-out rectangles on top of the grid
    pub fn with_keep_out_zones(mut self, zones: &[Rect]) -> Self {
        for zone in zones {
            self.mark_rect(zone);
        }
        self
    }

    fn mark_rect(&mut self, rect: &Rect) {
        if self.rows() == 0 || self.cols() == 0 {
            return;
        }
        let r = rect.normalized();
        let scale = |v: f64| (v * self.resolution).floor() as i64;
        let (c1, c2) = (scale(r.x1), scale(r.x2));
        let (r1, r2) = (scale(r.y1), scale(r.y2));
        let max_col = self.cols() as i64 - 1;
        let max_row = self.rows() as i64 - 1;
        if c2 < 0 || r2 < 0 || c1 > max_col || r1 > max_row {
            return;
        }
        let (c1, c2) = (c1.max(0) as usize, c2.min(max_col) as usize);
        let (r1, r2) = (r1.max(0) as usize, r2.min(max_row) as usize);
        self.grid
            .view_mut((r1, c1), (r2 - r1 + 1, c2 - c1 + 1))
            .fill(true);
    }
}

/// Rasterise obstacle rectangles into an occupancy grid.
///
/// The grid has `floor(extent * resolution) + 1` cells per axis. Each obstacle
/// blocks the inclusive range of cells between its scaled corners; parts
/// outside the grid are clipped.
pub fn build_grid(
    obstacles: &[ObstacleRect],
    max_extent_x: f64,
    max_extent_y: f64,
    resolution: f64,
) -> NavigationResult<OccupancyGrid> {
    build_grid_with_limit(obstacles, max_extent_x, max_extent_y, resolution, DEFAULT_MAX_CELLS)
}

/// Same as [`build_grid`], refusing grids of more than `max_cells` cells
pub fn build_grid_with_limit(
    obstacles: &[ObstacleRect],
    max_extent_x: f64,
    max_extent_y: f64,
    resolution: f64,
    max_cells: usize,
) -> NavigationResult<OccupancyGrid> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(NavigationError::InvalidGeometry(format!(
            "resolution must be positive, got {}",
            resolution
        )));
    }
    for extent in [max_extent_x, max_extent_y] {
        if !(extent.is_finite() && extent >= 0.0) {
            return Err(NavigationError::InvalidGeometry(format!(
                "plan extent must be non-negative, got {}",
                extent
            )));
        }
    }

    // sized in f64 first so huge extents are rejected before any cast
    let cols = (max_extent_x * resolution).floor() + 1.0;
    let rows = (max_extent_y * resolution).floor() + 1.0;
    if cols * rows > max_cells as f64 {
        return Err(NavigationError::InvalidGeometry(format!(
            "a {}x{} grid exceeds the limit of {} cells",
            rows, cols, max_cells
        )));
    }
    let (rows, cols) = (rows as usize, cols as usize);
    let mut grid = OccupancyGrid::empty(rows, cols, resolution);

    for obstacle in obstacles {
        if !obstacle.rect.is_finite() || obstacle.rect.is_degenerate() {
            return Err(NavigationError::InvalidGeometry(format!(
                "obstacle {} is not a proper rectangle: {:?}",
                obstacle.id, obstacle.rect
            )));
        }
        grid.mark_rect(&obstacle.rect);
    }

    debug!(
        "built {}x{} grid from {} obstacles, {} cells blocked",
        rows,
        cols,
        obstacles.len(),
        grid.blocked_count()
    );
    Ok(grid)
}
