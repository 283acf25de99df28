//! Request/response boundary for route planning
//!
//! Callers hand over the floor plan, the items to collect and the cart's
//! position history; they get back both a per-stop segment list and the
//! flattened, annotated path.

use std::collections::HashMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::common::{
    CartPosition, NavigationConfig, NavigationError, NavigationResult, ObstacleRect, Point2D,
    Rect, Waypoint,
};
use crate::mission_planning::{annotate, AnnotatedPoint, ArrivalTarget, RoutePlan, RouteSequencer};
use crate::utils::{build_grid_with_limit, OccupancyGrid};

/// Maximum plan coordinates covered by the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanExtent {
    pub max_x: f64,
    pub max_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub obstacles: Vec<ObstacleRect>,
    pub waypoints: Vec<Waypoint>,
    /// Position history; the latest timestamp is the current position
    #[serde(default)]
    pub positions: Vec<CartPosition>,
    #[serde(default)]
    pub floor_level: Option<i32>,
    #[serde(default)]
    pub extent: Option<PlanExtent>,
}

impl RouteRequest {
    pub fn from_json(json: &str) -> NavigationResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Obstacles that apply to the requested floor
    pub fn active_obstacles(&self) -> Vec<ObstacleRect> {
        self.obstacles
            .iter()
            .filter(|o| o.applies_to(self.floor_level))
            .cloned()
            .collect()
    }

    fn resolve_extent(&self, obstacles: &[ObstacleRect], current: Point2D, margin: f64) -> PlanExtent {
        if let Some(extent) = self.extent {
            return extent;
        }
        let xs = obstacles
            .iter()
            .flat_map(|o| [o.rect.x1, o.rect.x2])
            .chain(self.waypoints.iter().map(|w| w.x))
            .chain(std::iter::once(current.x));
        let ys = obstacles
            .iter()
            .flat_map(|o| [o.rect.y1, o.rect.y2])
            .chain(self.waypoints.iter().map(|w| w.y))
            .chain(std::iter::once(current.y));
        PlanExtent {
            max_x: xs.fold(0.0, f64::max) + margin,
            max_y: ys.fold(0.0, f64::max) + margin,
        }
    }
}

/// Route to one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub item_id: u64,
    pub section_id: u64,
    pub destination: Point2D,
    pub path: Vec<Point2D>,
    pub path_length: usize,
    pub last_instruction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub start: Point2D,
    pub segments: Vec<SegmentReport>,
    pub path: Vec<AnnotatedPoint>,
    /// Items that could not be routed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<u64>,
}

impl RouteResponse {
    pub fn from_plan(plan: &RoutePlan) -> Self {
        let targets: Vec<ArrivalTarget> = plan.legs.iter().map(ArrivalTarget::from).collect();
        let segments = plan
            .legs
            .iter()
            .map(|leg| SegmentReport {
                item_id: leg.waypoint.item_id,
                section_id: leg.waypoint.section_id,
                destination: leg.waypoint.position(),
                path: leg.points.points.clone(),
                path_length: leg.points.len(),
                last_instruction: format!("You have arrived at section {}", leg.waypoint.section_id),
            })
            .collect();

        RouteResponse {
            start: plan.start,
            segments,
            path: annotate(&plan.merged, &targets),
            skipped: plan.skipped.iter().map(|s| s.waypoint.item_id).collect(),
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn to_json(&self, pretty: bool) -> NavigationResult<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

/// Route `waypoints` from `current` on an already built grid.
///
/// The grid is only read, so one grid for an unchanged floor plan can be
/// shared (e.g. behind `Arc`) between concurrent requests.
pub fn route_on_grid(
    grid: &OccupancyGrid,
    current: Point2D,
    waypoints: &[Waypoint],
    sections: Option<HashMap<u64, Rect>>,
) -> NavigationResult<RouteResponse> {
    let mut sequencer = RouteSequencer::new(grid);
    if let Some(sections) = sections {
        sequencer = sequencer.with_section_snapping(sections);
    }
    let plan = sequencer.plan_route(current, waypoints)?;
    Ok(RouteResponse::from_plan(&plan))
}

/// Build the grid for `request` and plan its route.
pub fn plan_store_route(
    request: &RouteRequest,
    config: &NavigationConfig,
) -> NavigationResult<RouteResponse> {
    config.validate()?;
    let current = CartPosition::latest(&request.positions)
        .ok_or(NavigationError::NoCurrentPosition)?
        .position();
    if request.waypoints.is_empty() {
        return Err(NavigationError::NoDestinations);
    }
    if let Some(w) = request.waypoints.iter().find(|w| !w.position().is_finite()) {
        return Err(NavigationError::InvalidGeometry(format!(
            "item {} has non-finite coordinates",
            w.item_id
        )));
    }

    let obstacles = request.active_obstacles();
    let extent = request.resolve_extent(&obstacles, current, config.extent_margin);
    let grid = build_grid_with_limit(
        &obstacles,
        extent.max_x,
        extent.max_y,
        config.resolution,
        config.max_cells,
    )?
    .with_keep_out_zones(&config.keep_out_zones);

    let sections = config
        .snap_to_section_centerline
        .then(|| obstacles.iter().map(|o| (o.id, o.rect)).collect());

    let response = route_on_grid(&grid, current, &request.waypoints, sections)?;
    info!(
        "route from ({:.2}, {:.2}): {} segments, {} skipped",
        current.x,
        current.y,
        response.segments.len(),
        response.skipped.len()
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission_planning::Instruction;
    use crate::utils::build_grid;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::thread;

    fn position(x: f64, y: f64, minute: u32) -> CartPosition {
        CartPosition::new(x, y, Utc.with_ymd_and_hms(2024, 3, 2, 12, minute, 0).unwrap())
    }

    fn store_request() -> RouteRequest {
        RouteRequest {
            obstacles: vec![
                ObstacleRect::new(1, 2.0, 2.0, 3.0, 7.0),
                ObstacleRect::new(2, 6.0, 7.0, 7.0, 2.0),
            ],
            waypoints: vec![
                Waypoint::new(100, 8.0, 5.0, 2),
                Waypoint::new(101, 4.0, 4.0, 1),
            ],
            positions: vec![position(9.0, 9.0, 0), position(0.0, 0.0, 10)],
            floor_level: None,
            extent: Some(PlanExtent { max_x: 10.0, max_y: 10.0 }),
        }
    }

    #[test]
    fn test_plan_store_route_uses_latest_position() {
        let response = plan_store_route(&store_request(), &NavigationConfig::default()).unwrap();
        assert_eq!(response.start, Point2D::new(0.0, 0.0));
        assert_eq!(response.segments.len(), 2);
        assert_eq!(response.segments[0].item_id, 101);
        assert!(!response.is_partial());
        assert_eq!(response.path.first().map(|p| p.position()), Some(Point2D::new(0.0, 0.0)));
    }

    #[test]
    fn test_segments_carry_metadata() {
        let response = plan_store_route(&store_request(), &NavigationConfig::default()).unwrap();
        let seg = &response.segments[1];
        assert_eq!(seg.section_id, 2);
        assert_eq!(seg.destination, Point2D::new(8.0, 5.0));
        assert_eq!(seg.path_length, seg.path.len());
        assert_eq!(seg.last_instruction, "You have arrived at section 2");

        let arrivals = response
            .path
            .iter()
            .filter(|p| p.instruction == Some(Instruction::Arrive))
            .count();
        assert_eq!(arrivals, 2);
    }

    #[test]
    fn test_missing_position_and_destinations() {
        let mut request = store_request();
        request.positions.clear();
        assert!(matches!(
            plan_store_route(&request, &NavigationConfig::default()),
            Err(NavigationError::NoCurrentPosition)
        ));

        let mut request = store_request();
        request.waypoints.clear();
        assert!(matches!(
            plan_store_route(&request, &NavigationConfig::default()),
            Err(NavigationError::NoDestinations)
        ));
    }

    #[test]
    fn test_floor_filter_ignores_other_floors() {
        let mut request = store_request();
        request.obstacles = vec![ObstacleRect::new(1, 0.0, 1.0, 10.0, 2.0).on_floor(2)];
        request.floor_level = Some(0);
        let response = plan_store_route(&request, &NavigationConfig::default()).unwrap();
        // the wall lives on floor 2, so the path goes straight up from the origin
        assert_eq!(response.segments.len(), 2);

        request.floor_level = Some(2);
        let blocked = plan_store_route(&request, &NavigationConfig::default());
        assert!(blocked.is_err());
    }

    #[test]
    fn test_derived_extent_covers_inputs() {
        let mut request = store_request();
        request.extent = None;
        let obstacles = request.active_obstacles();
        let extent = request.resolve_extent(&obstacles, Point2D::new(0.0, 0.0), 1.0);
        assert_eq!(extent, PlanExtent { max_x: 9.0, max_y: 8.0 });
    }

    #[test]
    fn test_far_waypoint_exceeds_cell_budget() {
        let mut request = store_request();
        request.extent = None;
        request.waypoints.push(Waypoint::new(102, 1.0e7, 1.0, 3));
        assert!(matches!(
            plan_store_route(&request, &NavigationConfig::default()),
            Err(NavigationError::InvalidGeometry(_))
        ));

        // a 10 x 10 store does not fit into 50 cells either
        let config = NavigationConfig { max_cells: 50, ..Default::default() };
        assert!(matches!(
            plan_store_route(&store_request(), &config),
            Err(NavigationError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_keep_out_zone_from_config() {
        let mut request = store_request();
        request.obstacles.clear();
        request.waypoints = vec![Waypoint::new(1, 0.0, 5.0, 9)];
        let config = NavigationConfig {
            keep_out_zones: vec![Rect::new(0.0, 2.0, 5.0, 3.0)],
            ..Default::default()
        };
        let response = plan_store_route(&request, &config).unwrap();
        assert!(response
            .path
            .iter()
            .all(|p| !(p.x <= 5.0 && p.y >= 2.0 && p.y <= 3.0)));
    }

    #[test]
    fn test_json_round_trip_shape() {
        let json = r#"{
            "obstacles": [{"id": 1, "x1": 3.0, "y1": 0.0, "x2": 2.0, "y2": 3.0, "floor_level": 0}],
            "waypoints": [{"item_id": 7, "x": 5.0, "y": 1.0, "section_id": 1}],
            "positions": [{"x": 0.0, "y": 0.0, "timestamp": "2024-03-02T12:00:00Z"}],
            "extent": {"max_x": 6.0, "max_y": 5.0}
        }"#;
        let request = RouteRequest::from_json(json).unwrap();
        assert_eq!(request.obstacles[0].floor_level, Some(0));

        let response = plan_store_route(&request, &NavigationConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&response.to_json(false).unwrap()).unwrap();
        assert_eq!(value["segments"][0]["item_id"], 7);
        assert!(value.get("skipped").is_none());
        assert_eq!(
            value["path"].as_array().unwrap().last().unwrap()["instruction"],
            "You have arrived at your product"
        );
    }

    #[test]
    fn test_shared_grid_across_threads() {
        let grid = Arc::new(
            build_grid(&store_request().obstacles, 10.0, 10.0, 1.0).unwrap(),
        );
        let waypoints = store_request().waypoints;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let grid = Arc::clone(&grid);
                let waypoints = waypoints.clone();
                thread::spawn(move || route_on_grid(&grid, Point2D::origin(), &waypoints, None).unwrap())
            })
            .collect();
        let responses: Vec<RouteResponse> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(responses.windows(2).all(|w| w[0] == w[1]));
    }
}
