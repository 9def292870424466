use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::grid::GridLayout;

/// Errors from loading a streaming configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Streaming configuration: preload radius, grid layout and portal size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamConfig {
    /// Portal traversals from the root that are kept loaded.
    pub preload_hops: u32,
    /// Shared-space tiling; each world's extents must fit one cell.
    pub grid: GridLayout,
    /// Radius of portal visuals and crossing discs.
    pub portal_radius: f32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            preload_hops: 1,
            grid: GridLayout::default(),
            portal_radius: 1.0,
        }
    }
}

impl StreamConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = self.grid.cell_extent;
        if !(c.x > 0.0 && c.y > 0.0 && c.z > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "grid cell extent must be positive, got {c}"
            )));
        }
        if self.grid.columns == 0 || self.grid.rows == 0 {
            return Err(ConfigError::Invalid(
                "grid needs at least one column and row".into(),
            ));
        }
        if !(self.portal_radius > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "portal radius must be positive, got {}",
                self.portal_radius
            )));
        }
        Ok(())
    }
}
