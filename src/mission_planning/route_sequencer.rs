//! Multi-stop route sequencing
//!
//! Stops are ordered greedily: from the current cursor, the nearest remaining
//! waypoint by straight-line distance is visited next. This is a
//! nearest-neighbour approximation and does not produce the shortest tour.
//!
//! Waypoints that cannot be reached are skipped; the route only fails when no
//! waypoint at all could be routed.

use std::collections::HashMap;

use itertools::Itertools;
use log::{info, warn};
use ordered_float::OrderedFloat;

use crate::common::{
    GridCell, GridPath, GridPathPlanner, NavigationError, NavigationResult, Path2D, Point2D,
    Rect, Waypoint,
};
use crate::path_planning::AStarPlanner;
use crate::utils::OccupancyGrid;

/// One routed stop
#[derive(Debug, Clone)]
pub struct RouteLeg {
    pub waypoint: Waypoint,
    /// Point the leg was planned toward (the waypoint, or its centre-line snap)
    pub target: Point2D,
    pub path: GridPath,
    /// `path` converted to floor-plan coordinates
    pub points: Path2D,
}

impl RouteLeg {
    /// Where the leg actually ends, which differs from `target` when the
    /// target cell was blocked
    pub fn reached(&self) -> Option<Point2D> {
        self.points.points.last().copied()
    }
}

/// Waypoint left out of the route
#[derive(Debug)]
pub struct SkippedWaypoint {
    pub waypoint: Waypoint,
    pub error: NavigationError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStatus {
    Complete,
    /// Some waypoints were skipped; still a successful route
    Partial,
}

/// Ordered legs plus the merged path through all of them
#[derive(Debug)]
pub struct RoutePlan {
    /// First point of the merged path
    pub start: Point2D,
    pub legs: Vec<RouteLeg>,
    pub skipped: Vec<SkippedWaypoint>,
    /// All leg cells joined, without repeating the shared cell between legs
    pub cells: Vec<GridCell>,
    pub merged: Path2D,
}

impl RoutePlan {
    pub fn status(&self) -> RouteStatus {
        if self.skipped.is_empty() {
            RouteStatus::Complete
        } else {
            RouteStatus::Partial
        }
    }

    pub fn visit_order(&self) -> Vec<u64> {
        self.legs.iter().map(|leg| leg.waypoint.item_id).collect()
    }
}

/// Chains planner calls between consecutive stops on one grid
pub struct RouteSequencer<'a, P = AStarPlanner> {
    grid: &'a OccupancyGrid,
    planner: P,
    sections: HashMap<u64, Rect>,
}

impl<'a> RouteSequencer<'a, AStarPlanner> {
    pub fn new(grid: &'a OccupancyGrid) -> Self {
        Self::with_planner(grid, AStarPlanner::new())
    }
}

impl<'a, P: GridPathPlanner> RouteSequencer<'a, P> {
    pub fn with_planner(grid: &'a OccupancyGrid, planner: P) -> Self {
        RouteSequencer { grid, planner, sections: HashMap::new() }
    }

    /// Snap each waypoint onto the centre line of its section before routing
    pub fn with_section_snapping(mut self, sections: HashMap<u64, Rect>) -> Self {
        self.sections = sections;
        self
    }

    /// Order `waypoints` greedily from `cursor` and plan a leg to each.
    ///
    /// An out-of-bounds cursor or waypoint aborts the whole request.
    pub fn plan_route(&self, cursor: Point2D, waypoints: &[Waypoint]) -> NavigationResult<RoutePlan> {
        if waypoints.is_empty() {
            return Err(NavigationError::NoDestinations);
        }

        let mut cursor_cell = self.grid.cell_at(cursor)?;
        let mut cursor_point = cursor;
        let mut remaining: Vec<&Waypoint> = waypoints.iter().collect();
        let mut legs = Vec::new();
        let mut skipped = Vec::new();
        let mut cells: Vec<GridCell> = Vec::new();

        while let Some(next) = remaining
            .iter()
            .position_min_by_key(|w| OrderedFloat(cursor_point.distance(&w.position())))
        {
            let waypoint = remaining.remove(next);
            let target = self.target_for(waypoint);
            let goal_cell = self.grid.cell_at(target)?;

            let path = match self.planner.find_path(self.grid, cursor_cell, goal_cell) {
                Ok(path) => path,
                Err(e) if e.is_waypoint_local() => {
                    warn!("skipping item {}: {}", waypoint.item_id, e);
                    skipped.push(SkippedWaypoint { waypoint: waypoint.clone(), error: e });
                    continue;
                }
                Err(e) => return Err(e),
            };
            let Some(reached) = path.goal() else {
                warn!("skipping item {}: planner returned an empty path", waypoint.item_id);
                skipped.push(SkippedWaypoint {
                    waypoint: waypoint.clone(),
                    error: NavigationError::NoPathFound { start: cursor_cell, goal: goal_cell },
                });
                continue;
            };

            let skip = if cells.is_empty() { 0 } else { 1 };
            cells.extend(path.cells.iter().skip(skip));

            let points = Path2D::from_points(
                path.cells.iter().map(|&c| self.grid.cell_to_point(c)).collect(),
            );
            cursor_cell = reached;
            cursor_point = self.grid.cell_to_point(reached);
            legs.push(RouteLeg { waypoint: waypoint.clone(), target, path, points });
        }

        if legs.is_empty() {
            return Err(NavigationError::TotalFailure { attempted: waypoints.len() });
        }

        let merged = Path2D::from_points(cells.iter().map(|&c| self.grid.cell_to_point(c)).collect());
        info!(
            "planned route through {} of {} waypoints, {} cells, length {:.2}",
            legs.len(),
            waypoints.len(),
            cells.len(),
            merged.total_length()
        );

        // the cursor cell may have been swapped for a free one by the planner
        let start = merged.points.first().copied().unwrap_or(cursor);
        Ok(RoutePlan { start, legs, skipped, cells, merged })
    }

    fn target_for(&self, waypoint: &Waypoint) -> Point2D {
        match self.sections.get(&waypoint.section_id) {
            Some(section) => section.snap_to_centerline(&waypoint.position()),
            None => waypoint.position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn open_grid() -> OccupancyGrid {
        OccupancyGrid::empty(10, 10, 1.0)
    }

    #[test]
    fn test_nearest_waypoint_first() {
        let grid = open_grid();
        let waypoints = vec![
            Waypoint::new(1, 3.0, 4.0, 10),
            Waypoint::new(2, 2.0, 0.0, 20),
        ];
        let plan = RouteSequencer::new(&grid)
            .plan_route(Point2D::origin(), &waypoints)
            .unwrap();
        assert_eq!(plan.visit_order(), vec![2, 1]);
        assert_eq!(plan.status(), RouteStatus::Complete);
    }

    #[test]
    fn test_greedy_order_follows_cursor() {
        let grid = open_grid();
        let waypoints = vec![
            Waypoint::new(1, 9.0, 0.0, 1),
            Waypoint::new(2, 1.0, 0.0, 1),
            Waypoint::new(3, 0.0, 9.0, 1),
            Waypoint::new(4, 5.0, 0.0, 1),
        ];
        let plan = RouteSequencer::new(&grid)
            .plan_route(Point2D::origin(), &waypoints)
            .unwrap();
        assert_eq!(plan.visit_order(), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_merged_path_joins_legs_without_duplicates() {
        let grid = open_grid();
        let waypoints = vec![
            Waypoint::new(1, 4.0, 0.0, 1),
            Waypoint::new(2, 4.0, 3.0, 1),
        ];
        let plan = RouteSequencer::new(&grid)
            .plan_route(Point2D::origin(), &waypoints)
            .unwrap();

        let leg_cells: usize = plan.legs.iter().map(|l| l.path.len()).sum();
        assert_eq!(plan.cells.len(), leg_cells - 1);
        assert_eq!(plan.cells.len(), 8);
        for w in plan.cells.windows(2) {
            assert!(w[0].is_adjacent(&w[1]));
        }
        assert_eq!(plan.merged.len(), plan.cells.len());
        assert_eq!(plan.merged.points.last(), Some(&Point2D::new(4.0, 3.0)));
    }

    #[test]
    fn test_unreachable_waypoint_is_skipped() {
        let grid = OccupancyGrid::from_ascii(
            &[
                ".......",
                "..###..",
                "..#.#..",
                "..###..",
                ".......",
            ],
            1.0,
        );
        let waypoints = vec![
            Waypoint::new(1, 3.0, 2.0, 1),
            Waypoint::new(2, 6.0, 4.0, 2),
        ];
        let plan = RouteSequencer::new(&grid)
            .plan_route(Point2D::origin(), &waypoints)
            .unwrap();
        assert_eq!(plan.visit_order(), vec![2]);
        assert_eq!(plan.status(), RouteStatus::Partial);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].waypoint.item_id, 1);
        assert!(matches!(plan.skipped[0].error, NavigationError::NoPathFound { .. }));
    }

    #[test]
    fn test_total_failure_when_nothing_routes() {
        let grid = OccupancyGrid::from_ascii(&[".#.", "##.", "..."], 1.0);
        let waypoints = vec![Waypoint::new(1, 2.0, 2.0, 1)];
        let result = RouteSequencer::new(&grid).plan_route(Point2D::origin(), &waypoints);
        assert!(matches!(result, Err(NavigationError::TotalFailure { attempted: 1 })));
    }

    #[test]
    fn test_out_of_bounds_waypoint_aborts() {
        let grid = open_grid();
        let waypoints = vec![
            Waypoint::new(1, 2.0, 2.0, 1),
            Waypoint::new(2, 25.0, 2.0, 1),
        ];
        let result = RouteSequencer::new(&grid).plan_route(Point2D::origin(), &waypoints);
        assert!(matches!(result, Err(NavigationError::OutOfBounds { .. })));

        let cursor_outside = RouteSequencer::new(&grid).plan_route(Point2D::new(-1.0, 0.0), &waypoints[..1]);
        assert!(matches!(cursor_outside, Err(NavigationError::OutOfBounds { .. })));
    }

    #[test]
    fn test_no_destinations() {
        let grid = open_grid();
        let result = RouteSequencer::new(&grid).plan_route(Point2D::origin(), &[]);
        assert!(matches!(result, Err(NavigationError::NoDestinations)));
    }

    #[test]
    fn test_blocked_target_moves_cursor_to_reached_cell() {
        let grid = OccupancyGrid::from_ascii(
            &[
                "........",
                "........",
                "....##..",
                "....##..",
                "........",
            ],
            1.0,
        );
        // first target sits inside the shelf, second is beyond it
        let waypoints = vec![
            Waypoint::new(1, 4.0, 2.0, 7),
            Waypoint::new(2, 7.0, 4.0, 8),
        ];
        let plan = RouteSequencer::new(&grid)
            .plan_route(Point2D::origin(), &waypoints)
            .unwrap();

        let first = &plan.legs[0];
        let reached = first.path.goal().unwrap();
        assert!(grid.is_free(reached));
        assert_ne!(reached, GridCell::new(2, 4));
        assert_eq!(plan.legs[1].path.start(), Some(reached));
    }

    #[test]
    fn test_blocked_start_reports_substituted_start() {
        let grid = OccupancyGrid::from_ascii(&["#....", ".....", "....."], 1.0);
        let plan = RouteSequencer::new(&grid)
            .plan_route(Point2D::new(0.5, 0.5), &[Waypoint::new(1, 4.0, 2.0, 1)])
            .unwrap();
        assert_eq!(plan.start, Point2D::new(1.0, 0.0));
        assert_eq!(plan.merged.points.first(), Some(&plan.start));
        assert_eq!(plan.cells.first(), Some(&GridCell::new(0, 1)));
    }

    #[test]
    fn test_section_snapping_moves_target_to_centerline() {
        let grid = OccupancyGrid::empty(11, 11, 1.0);
        let sections: HashMap<u64, Rect> = [(5, Rect::new(0.0, 4.0, 10.0, 6.0))].into_iter().collect();
        let waypoints = vec![Waypoint::new(1, 7.0, 4.2, 5)];
        let plan = RouteSequencer::new(&grid)
            .with_section_snapping(sections)
            .plan_route(Point2D::origin(), &waypoints)
            .unwrap();
        assert_eq!(plan.legs[0].target, Point2D::new(7.0, 5.0));
        assert_eq!(plan.legs[0].reached(), Some(Point2D::new(7.0, 5.0)));
    }

    struct FailingOnce {
        calls: Cell<usize>,
    }

    impl GridPathPlanner for FailingOnce {
        fn find_path(
            &self,
            grid: &OccupancyGrid,
            start: GridCell,
            goal: GridCell,
        ) -> NavigationResult<GridPath> {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() == 1 {
                return Err(NavigationError::SearchInvariant("corrupted".to_string()));
            }
            AStarPlanner.find_path(grid, start, goal)
        }
    }

    #[test]
    fn test_custom_planner_failure_skips_waypoint() {
        let grid = open_grid();
        let planner = FailingOnce { calls: Cell::new(0) };
        let waypoints = vec![
            Waypoint::new(1, 1.0, 0.0, 1),
            Waypoint::new(2, 3.0, 0.0, 1),
        ];
        let plan = RouteSequencer::with_planner(&grid, &planner)
            .plan_route(Point2D::origin(), &waypoints)
            .unwrap();
        assert_eq!(planner.calls.get(), 2);
        assert_eq!(plan.visit_order(), vec![2]);
        // the failed leg does not move the cursor, so the route still starts at the origin
        assert_eq!(plan.cells.first(), Some(&GridCell::new(0, 0)));
    }
}
