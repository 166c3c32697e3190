// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor configuration, stored as RON.

use crate::hit_test::DEFAULT_PORT_HIT_MARGIN;
use crate::links::{LinkStyle, DEFAULT_CURVATURE, DEFAULT_HOVER_WIDTH};
use crate::magnet::DEFAULT_TOLERANCE;
use crate::validation::ConnectionRules;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Margin added around the node bounds to form the pannable area
pub const DEFAULT_BOUNDS_MARGIN: f32 = 60.0;
/// How long an alert stays fully visible
pub const DEFAULT_ALERT_DURATION_MS: u64 = 1000;

/// Errors reading or writing a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// File content is not valid RON for this type
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Configuration could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Editor behavior settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Permit connections that close a cycle
    pub allow_loops: bool,
    /// Permit a wildcard output to feed a typed input
    pub allow_untyped_to_typed: bool,
    /// Vertical wheel only zooms while ctrl is held
    pub require_ctrl_for_zoom: bool,
    /// Snap dragged nodes to their neighbours
    pub show_magnet: bool,
    /// Send the view home when panning an empty canvas
    pub reset_view_when_empty: bool,
    /// Link curvature in `[0, 1]`
    pub curvature: f32,
    /// Upper bound for link control offsets
    pub max_control_offset: Option<f32>,
    /// Extra hit margin around port dots
    pub port_hit_margin: f32,
    /// Stroke width for link hover tests
    pub link_hover_width: f32,
    /// Snap distance for the magnet
    pub magnet_tolerance: f32,
    /// Margin around the node bounds that stays reachable
    pub bounds_margin: f32,
    /// How long alerts stay fully visible before fading
    pub alert_duration_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            allow_loops: false,
            allow_untyped_to_typed: false,
            require_ctrl_for_zoom: true,
            show_magnet: true,
            reset_view_when_empty: true,
            curvature: DEFAULT_CURVATURE,
            max_control_offset: None,
            port_hit_margin: DEFAULT_PORT_HIT_MARGIN,
            link_hover_width: DEFAULT_HOVER_WIDTH,
            magnet_tolerance: DEFAULT_TOLERANCE,
            bounds_margin: DEFAULT_BOUNDS_MARGIN,
            alert_duration_ms: DEFAULT_ALERT_DURATION_MS,
        }
    }
}

impl EditorConfig {
    /// Parse from a RON string; missing fields take their defaults
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(content)?)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&content)?;
        tracing::info!("Loaded editor config from {:?}", path);
        Ok(config)
    }

    /// Save to a RON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Structural connection rules
    pub fn connection_rules(&self) -> ConnectionRules {
        ConnectionRules {
            allow_loops: self.allow_loops,
            allow_untyped_to_typed: self.allow_untyped_to_typed,
        }
    }

    /// Link shape
    pub fn link_style(&self) -> LinkStyle {
        LinkStyle::new(self.curvature, self.max_control_offset.unwrap_or(f32::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert!(!config.allow_loops);
        assert!(config.require_ctrl_for_zoom);
        assert_eq!(config.port_hit_margin, 3.0);
        assert_eq!(config.link_style().control_offset(10.0), 30.0);
    }

    #[test]
    fn test_partial_ron_fills_defaults() {
        let config = EditorConfig::from_ron("(allow_loops: true, curvature: 0.5)").unwrap();
        assert!(config.allow_loops);
        assert_eq!(config.curvature, 0.5);
        assert!(config.show_magnet);
        assert!(config.connection_rules().allow_loops);
    }

    #[test]
    fn test_serialization() {
        let config = EditorConfig {
            max_control_offset: Some(120.0),
            ..EditorConfig::default()
        };
        let ron_str = config.to_ron().unwrap();
        assert_eq!(EditorConfig::from_ron(&ron_str).unwrap(), config);
    }

    #[test]
    fn test_invalid_ron() {
        assert!(matches!(EditorConfig::from_ron("(curvature: \"high\")"), Err(ConfigError::Parse(_))));
    }
}
