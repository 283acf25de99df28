//! Common traits defining interfaces between the routing stages

use crate::common::error::NavigationResult;
use crate::common::types::{GridCell, GridPath};
use crate::utils::OccupancyGrid;

/// Trait for grid-based path planning algorithms
///
/// Implementations must not keep search state between calls: the grid is
/// borrowed read-only and every call owns its own bookkeeping.
pub trait GridPathPlanner {
    /// Plan a path on `grid` from `start` to `goal`
    fn find_path(
        &self,
        grid: &OccupancyGrid,
        start: GridCell,
        goal: GridCell,
    ) -> NavigationResult<GridPath>;
}

impl<P: GridPathPlanner + ?Sized> GridPathPlanner for &P {
    fn find_path(
        &self,
        grid: &OccupancyGrid,
        start: GridCell,
        goal: GridCell,
    ) -> NavigationResult<GridPath> {
        (**self).find_path(grid, start, goal)
    }
}
