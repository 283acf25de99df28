//! A* path planning on an occupancy grid
//!
//! 4-connected moves with unit cost and the Manhattan distance as heuristic,
//! which is admissible and consistent for this motion model, so the first
//! time the goal is popped its cost is optimal.
//!
//! Blocked endpoints are first moved to the nearest free cell by graph
//! distance (breadth-first over 4-neighbours).
//!
//! Stale queue entries are not removed; a popped entry whose cost is worse
//! than the best known cost of its cell is skipped.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use log::debug;

use crate::common::{GridCell, GridPath, GridPathPlanner, NavigationError, NavigationResult};
use crate::utils::OccupancyGrid;

/// Node with priority for A* open set (min-heap)
#[derive(Debug, PartialEq, Eq)]
struct PriorityNode {
    cell: GridCell,
    cost: u32,
    heuristic: u32,
    priority: u32,
}

impl Ord for PriorityNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior; prefer nodes closer to the goal on ties
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.heuristic.cmp(&self.heuristic))
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for PriorityNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* path planner
///
/// Holds no search state: every call allocates its own open set, cost table
/// and predecessor map, so one planner can serve concurrent requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AStarPlanner;

impl AStarPlanner {
    pub fn new() -> Self {
        AStarPlanner
    }
}

impl GridPathPlanner for AStarPlanner {
    fn find_path(
        &self,
        grid: &OccupancyGrid,
        start: GridCell,
        goal: GridCell,
    ) -> NavigationResult<GridPath> {
        let start = resolve_endpoint(grid, start)?;
        let goal = resolve_endpoint(grid, goal)?;

        let mut open_set = BinaryHeap::new();
        let mut g_score: HashMap<GridCell, u32> = HashMap::new();
        let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
        let mut expansion_order: HashMap<GridCell, usize> = HashMap::new();

        g_score.insert(start, 0);
        let h = start.manhattan(&goal);
        open_set.push(PriorityNode { cell: start, cost: 0, heuristic: h, priority: h });

        while let Some(current) = open_set.pop() {
            let best = g_score.get(&current.cell).copied().unwrap_or(u32::MAX);
            if current.cost > best {
                continue;
            }
            let order = expansion_order.len();
            expansion_order.entry(current.cell).or_insert(order);

            if current.cell == goal {
                let cells = reconstruct_path(&came_from, &expansion_order, start, goal)?;
                debug!(
                    "A* expanded {} cells, path of {} cells from {:?} to {:?}",
                    expansion_order.len(),
                    cells.len(),
                    start,
                    goal
                );
                return Ok(GridPath { cells, expanded: expansion_order.len() });
            }

            for next in grid.neighbors(current.cell) {
                if grid.is_blocked(next) {
                    continue;
                }
                let tentative = current.cost + 1;
                if tentative < g_score.get(&next).copied().unwrap_or(u32::MAX) {
                    // predecessor is the cell being expanded, never `next` itself
                    came_from.insert(next, current.cell);
                    g_score.insert(next, tentative);
                    let h = next.manhattan(&goal);
                    open_set.push(PriorityNode {
                        cell: next,
                        cost: tentative,
                        heuristic: h,
                        priority: tentative + h,
                    });
                }
            }
        }

        debug!(
            "A* open set empty after expanding {} cells, no path {:?} -> {:?}",
            expansion_order.len(),
            start,
            goal
        );
        Err(NavigationError::NoPathFound { start, goal })
    }
}

/// Plan with the default A* planner
pub fn find_path(grid: &OccupancyGrid, start: GridCell, goal: GridCell) -> NavigationResult<GridPath> {
    AStarPlanner.find_path(grid, start, goal)
}

/// Map an endpoint to a free cell.
///
/// Free cells are returned unchanged. A blocked cell is replaced by the first
/// free cell found breadth-first over 4-neighbours (graph distance, not
/// Euclidean distance).
pub fn resolve_endpoint(grid: &OccupancyGrid, cell: GridCell) -> NavigationResult<GridCell> {
    if !grid.contains(cell) {
        let p = grid.cell_to_point(cell);
        return Err(NavigationError::OutOfBounds { x: p.x, y: p.y });
    }
    if grid.is_free(cell) {
        return Ok(cell);
    }

    let mut queue = VecDeque::new();
    let mut seen = HashSet::new();
    queue.push_back(cell);
    seen.insert(cell);

    while let Some(current) = queue.pop_front() {
        for next in grid.neighbors(current) {
            if !seen.insert(next) {
                continue;
            }
            if grid.is_free(next) {
                debug!("endpoint {:?} is blocked, using {:?}", cell, next);
                return Ok(next);
            }
            queue.push_back(next);
        }
    }

    Err(NavigationError::Unreachable(cell))
}

/// Walk predecessor links from `goal` back to `start`.
///
/// Every step must land on a cell expanded strictly earlier than the current
/// one, which bounds the walk by the number of expanded cells.
fn reconstruct_path(
    came_from: &HashMap<GridCell, GridCell>,
    expansion_order: &HashMap<GridCell, usize>,
    start: GridCell,
    goal: GridCell,
) -> NavigationResult<Vec<GridCell>> {
    let order_of = |cell: &GridCell| {
        expansion_order.get(cell).copied().ok_or_else(|| {
            NavigationError::SearchInvariant(format!("{:?} on the path was never expanded", cell))
        })
    };

    let mut path = vec![goal];
    let mut current = goal;
    let mut current_order = order_of(&goal)?;

    while current != start {
        let prev = *came_from.get(&current).ok_or_else(|| {
            NavigationError::SearchInvariant(format!("{:?} has no predecessor", current))
        })?;
        if prev == current {
            return Err(NavigationError::SearchInvariant(format!(
                "{:?} is its own predecessor",
                current
            )));
        }
        let prev_order = order_of(&prev)?;
        if prev_order >= current_order || path.len() > expansion_order.len() {
            return Err(NavigationError::SearchInvariant(format!(
                "predecessor {:?} of {:?} does not lead back to the start",
                prev, current
            )));
        }
        path.push(prev);
        current = prev;
        current_order = prev_order;
    }

    path.reverse();
    Ok(path)
}
