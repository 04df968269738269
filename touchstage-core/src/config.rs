use crate::error::Result;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine tuning parameters
///
/// Every field has a default so partial JSON files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pointer separation (px) below which a pinch has no usable distance or angle
    pub min_pinch_distance: f64,

    /// Lower clamp for any gesture scale factor
    pub min_scale_factor: f64,

    /// Upper clamp for any gesture scale factor
    pub max_scale_factor: f64,

    /// Image pixels with alpha above this value count as a hit
    pub alpha_threshold: u8,

    /// z-index given to an element while it is being dragged
    pub drag_z_index: i32,

    /// Hit radius (px) of the resize handle grip
    pub handle_grip_radius: f64,

    /// Where a detached handle is parked
    pub handle_offscreen: Point,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_pinch_distance: 1.0,
            min_scale_factor: 0.01,
            max_scale_factor: 100.0,
            alpha_threshold: 0,
            drag_z_index: 100_000,
            handle_grip_radius: 16.0,
            handle_offscreen: Point::new(-10_000.0, -10_000.0),
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load config from a file
    /// Returns default config if the file doesn't exist or is malformed
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load engine config {:?}: {}", path, e);
                log::warn!("Using default engine configuration");
                Self::default()
            }
        }
    }

    /// Try to load config, returning an error if something goes wrong
    ///
    /// A missing file is not an error and yields the defaults.
    pub fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Clamp a gesture scale factor into the configured range
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        if !scale.is_finite() {
            return 1.0;
        }
        scale.clamp(self.min_scale_factor, self.max_scale_factor)
    }
}
