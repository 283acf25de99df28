//! store_navigation - in-store shopper route planning
//!
//! Rasterises store sections into an occupancy grid, plans A* legs between
//! the items on a shopping list, and annotates the joined route with
//! turn-by-turn and arrival instructions.

// Core modules
pub mod common;
pub mod utils;

// Routing stages
pub mod path_planning;
pub mod mission_planning;

// Request/response boundary
pub mod api;

// Re-export common types for convenience
pub use common::{Point2D, Path2D, GridCell, GridPath, Rect, ObstacleRect, Waypoint, CartPosition};
pub use common::{GridPathPlanner, NavigationConfig};
pub use common::{NavigationError, NavigationResult};
pub use utils::{build_grid, build_grid_with_limit, OccupancyGrid};
pub use path_planning::{find_path, AStarPlanner};
pub use mission_planning::{annotate, Instruction, RoutePlan, RouteSequencer, RouteStatus};
pub use api::{plan_store_route, RouteRequest, RouteResponse};
