//! Error types for store_navigation

use thiserror::Error;

use crate::common::types::GridCell;

/// Main error type for routing requests
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Start or goal lies outside the plan extents
    #[error("Position ({x}, {y}) is outside the floor plan")]
    OutOfBounds { x: f64, y: f64 },
    /// Endpoint is blocked and no free cell could be reached from it
    #[error("No free cell reachable from blocked cell ({}, {})", .0.row, .0.col)]
    Unreachable(GridCell),
    /// Search exhausted its frontier
    #[error("No path found from ({}, {}) to ({}, {})", .start.row, .start.col, .goal.row, .goal.col)]
    NoPathFound { start: GridCell, goal: GridCell },
    /// Predecessor chain did not make forward progress toward the start
    #[error("Search state is inconsistent: {0}")]
    SearchInvariant(String),
    /// Not a single waypoint could be routed
    #[error("No path could be computed for any of {attempted} waypoints")]
    TotalFailure { attempted: usize },
    #[error("No known current position")]
    NoCurrentPosition,
    #[error("No destinations provided")]
    NoDestinations,
    /// Malformed obstacle, waypoint or extent
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NavigationError {
    /// Failures that only affect a single waypoint; the sequencer skips it and moves on
    pub fn is_waypoint_local(&self) -> bool {
        matches!(
            self,
            NavigationError::Unreachable(_)
                | NavigationError::NoPathFound { .. }
                | NavigationError::SearchInvariant(_)
        )
    }
}

impl From<toml::de::Error> for NavigationError {
    fn from(e: toml::de::Error) -> Self {
        NavigationError::Config(e.to_string())
    }
}

/// Result type alias for navigation operations
pub type NavigationResult<T> = Result<T, NavigationError>;
