//! Routing configuration
//!
//! Loaded from TOML; every field has a default so a partial file is fine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::error::{NavigationError, NavigationResult};
use crate::common::types::Rect;
use crate::utils::grid_map::DEFAULT_MAX_CELLS;

/// Configuration for grid construction and route planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Grid cells per plan-distance unit
    pub resolution: f64,
    /// Permanent no-go rectangles applied after the obstacles
    pub keep_out_zones: Vec<Rect>,
    /// Snap waypoints onto their section's centre line before routing
    pub snap_to_section_centerline: bool,
    /// Added to the derived extent when a request does not give one
    pub extent_margin: f64,
    /// Upper bound on the number of grid cells a request may allocate
    pub max_cells: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            keep_out_zones: Vec::new(),
            snap_to_section_centerline: false,
            extent_margin: 0.0,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

impl NavigationConfig {
    pub fn from_toml_str(contents: &str) -> NavigationResult<Self> {
        let config: NavigationConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> NavigationResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> NavigationResult<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(NavigationError::Config(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if !(self.extent_margin.is_finite() && self.extent_margin >= 0.0) {
            return Err(NavigationError::Config(format!(
                "extent_margin must be non-negative, got {}",
                self.extent_margin
            )));
        }
        if self.max_cells == 0 {
            return Err(NavigationError::Config("max_cells must be at least 1".to_string()));
        }
        if let Some(zone) = self
            .keep_out_zones
            .iter()
            .find(|z| !z.is_finite() || z.is_degenerate())
        {
            return Err(NavigationError::Config(format!(
                "keep-out zone {:?} is degenerate",
                zone
            )));
        }
        Ok(())
    }
}
