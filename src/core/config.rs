//! Engine configuration - deployment constants and tolerance limits
//!
//! Every numeric constant the engine compares against is supplied here, never
//! hard-coded in engine logic. Defaults mirror the endcap deployment; sites
//! override them with a YAML file.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yml::Error),
}

/// Three-tier glue-thickness band in micrometers.
///
/// Values in `[hard_min, soft_max]` pass clean; `(soft_max, hard_max]` pass
/// with a warning; anything outside `[hard_min, hard_max]` fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlueBand {
    pub hard_min: f64,
    pub soft_max: f64,
    pub hard_max: f64,
}

impl Default for GlueBand {
    fn default() -> Self {
        GlueBand {
            hard_min: 40.0,
            soft_max: 70.0,
            hard_max: 170.0,
        }
    }
}

/// Open bow acceptance interval in micrometers, signed by concavity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BowBand {
    pub min: f64,
    pub max: f64,
}

impl Default for BowBand {
    fn default() -> Self {
        BowBand {
            min: -50.0,
            max: 150.0,
        }
    }
}

/// Nominal flex-material thickness per component type, micrometers.
/// Subtracted from measured surface height to get glue-bond thickness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlexThickness {
    #[serde(default = "default_hybrid_flex")]
    pub hybrid_um: f64,

    #[serde(default = "default_powerboard_flex")]
    pub powerboard_um: f64,
}

fn default_hybrid_flex() -> f64 {
    280.0
}

fn default_powerboard_flex() -> f64 {
    295.0
}

impl Default for FlexThickness {
    fn default() -> Self {
        FlexThickness {
            hybrid_um: default_hybrid_flex(),
            powerboard_um: default_powerboard_flex(),
        }
    }
}

/// Tolerance bands applied by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceLimits {
    /// Positional deviation limit in X, micrometers (open interval)
    #[serde(default = "default_axis_limit")]
    pub x_limit_um: f64,

    /// Positional deviation limit in Y, micrometers (open interval)
    #[serde(default = "default_axis_limit")]
    pub y_limit_um: f64,

    /// Glue thickness band
    #[serde(default)]
    pub glue_band: GlueBand,

    /// Maximum allowed shield height, micrometers
    #[serde(default = "default_max_shield_height")]
    pub max_shield_height_um: f64,

    /// Bow acceptance interval
    #[serde(default)]
    pub bow_band: BowBand,
}

fn default_axis_limit() -> f64 {
    250.0
}

fn default_max_shield_height() -> f64 {
    6110.0
}

impl Default for ToleranceLimits {
    fn default() -> Self {
        ToleranceLimits {
            x_limit_um: default_axis_limit(),
            y_limit_um: default_axis_limit(),
            glue_band: GlueBand::default(),
            max_shield_height_um: default_max_shield_height(),
            bow_band: BowBand::default(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub limits: ToleranceLimits,

    #[serde(default)]
    pub flex: FlexThickness,
}

impl EngineConfig {
    /// Parse a YAML config document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(content)?)
    }

    /// Load from a YAML file.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_endcap_deployment() {
        let config = EngineConfig::default();
        assert_eq!(config.limits.x_limit_um, 250.0);
        assert_eq!(config.limits.y_limit_um, 250.0);
        assert_eq!(config.limits.glue_band.hard_min, 40.0);
        assert_eq!(config.limits.glue_band.soft_max, 70.0);
        assert_eq!(config.limits.glue_band.hard_max, 170.0);
        assert_eq!(config.limits.max_shield_height_um, 6110.0);
        assert_eq!(config.limits.bow_band.min, -50.0);
        assert_eq!(config.limits.bow_band.max, 150.0);
        assert_eq!(config.flex.hybrid_um, 280.0);
        assert_eq!(config.flex.powerboard_um, 295.0);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults_elsewhere() {
        let yaml = "limits:\n  x_limit_um: 100.0\n";
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limits.x_limit_um, 100.0);
        assert_eq!(config.limits.y_limit_um, 250.0);
        assert_eq!(config.flex.hybrid_um, 280.0);
    }

    #[test]
    fn test_glue_band_override() {
        let yaml = "limits:\n  glue_band:\n    hard_min: 30.0\n    soft_max: 60.0\n    hard_max: 150.0\n";
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limits.glue_band.soft_max, 60.0);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(EngineConfig::from_yaml("limits: [nonsense").is_err());
    }
}
