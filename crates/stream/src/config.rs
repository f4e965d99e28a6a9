use std::path::Path;

use regionview_common::REGION_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::StreamError;

/// Streaming configuration: window range, update cadence and load budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Chebyshev radius (in regions) of the streaming window.
    pub load_range: u32,
    /// Edge length of one region in world units.
    pub region_size: f32,
    /// Seconds of accumulated frame time between window updates.
    pub update_interval: f32,
    /// Maximum regions loaded per update. `None` loads the whole window in
    /// one update. Evictions are never limited.
    pub load_budget: Option<usize>,
    /// Texture layer for ids missing from the layer map.
    pub default_layer: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            load_range: 2,
            region_size: REGION_SIZE,
            update_interval: 0.5,
            load_budget: None,
            default_layer: 0,
        }
    }
}

impl StreamConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StreamError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
