//! Engine tunables.
//!
//! All thresholds are empirical. They are plain data so a host can load them
//! from JSON and override only the fields it cares about.

use std::time::Duration;

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::types::positive;

/// Top-level configuration document
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub renderer: RendererConfig,
    pub culling: CullConfig,
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate()?;
        self.culling.validate()
    }
}

/// Drawer thresholds
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Largest object count drawn synchronously onto the visible surface
    pub sync_threshold: usize,
    /// Object count above which a task is registered for the chunked render
    pub progress_threshold: usize,
    /// Chunk size when every object is a point
    pub point_chunk_size: usize,
    /// Chunk size for everything else
    pub object_chunk_size: usize,
    /// Thin dense point data to one point per grid cell
    pub decimate: bool,
    /// Decimation only kicks in above this many objects
    pub decimate_min_objects: usize,
    /// Decimation grid size in screen pixels
    pub decimate_fuzz: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            sync_threshold: 500,
            progress_threshold: 15_000,
            point_chunk_size: 2_000,
            object_chunk_size: 1_000,
            decimate: false,
            decimate_min_objects: 150,
            decimate_fuzz: 5,
        }
    }
}

impl RendererConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least("renderer.point_chunk_size", self.point_chunk_size as u64, 1)?;
        at_least("renderer.object_chunk_size", self.object_chunk_size as u64, 1)?;
        at_least("renderer.decimate_fuzz", self.decimate_fuzz as u64, 1)
    }
}

/// MOC culling parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CullConfig {
    /// Orders past the HiPS order that culling may descend
    pub max_depth: u8,
    /// Wall-clock budget for one culling step
    pub time_budget_ms: u64,
    /// Stop building the visible map once an order has more cells than this
    pub visible_cell_limit: usize,
    /// Above this field of view no visible map is built at all
    pub max_fov_deg: f64,
    /// Tiles turned into draw objects per layer update step
    pub max_chunk: usize,
}

impl Default for CullConfig {
    fn default() -> Self {
        CullConfig {
            max_depth: 3,
            time_budget_ms: 20,
            visible_cell_limit: 5_000,
            max_fov_deg: 200.0,
            max_chunk: 500,
        }
    }
}

impl CullConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive(self.max_fov_deg).map_err(|source| ConfigError::InvalidValue {
            field: "culling.max_fov_deg",
            source,
        })?;
        at_least("culling.time_budget_ms", self.time_budget_ms, 1)?;
        at_least("culling.visible_cell_limit", self.visible_cell_limit as u64, 1)?;
        at_least("culling.max_chunk", self.max_chunk as u64, 1)
    }
}

fn at_least(field: &'static str, value: u64, min: u64) -> Result<(), ConfigError> {
    if value < min {
        Err(ConfigError::TooSmall { field, value, min })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NumericError;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert_eq!(CullConfig::default().time_budget(), Duration::from_millis(20));
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "renderer": { "sync_threshold": 100 } }"#).unwrap();
        assert_eq!(config.renderer.sync_threshold, 100);
        assert_eq!(config.renderer.progress_threshold, 15_000);
        assert_eq!(config.culling, CullConfig::default());
    }

    #[test]
    fn rejects_zero_chunk() {
        let err = EngineConfig::from_json_str(r#"{ "renderer": { "point_chunk_size": 0 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TooSmall {
                field: "renderer.point_chunk_size",
                ..
            }
        ));
    }

    #[test]
    fn rejects_negative_fov() {
        let err =
            EngineConfig::from_json_str(r#"{ "culling": { "max_fov_deg": -1.0 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                source: NumericError::Negative,
                ..
            }
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
