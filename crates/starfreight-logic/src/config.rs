//! Engine tunables.
//!
//! Loaded by the host (TOML in the harness) or built from `Default`. Validate
//! with [`EngineConfig::validate`] before handing it to the engine.
//!
//! ```
//! use starfreight_logic::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert!(config.validate().is_empty());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resources::{ResourceKind, ResourceMap};

/// Real milliseconds in one game hour at 1× speed.
pub const DEFAULT_MS_PER_GAME_HOUR: f64 = 3_600_000.0;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scales every vehicle's cruise speed (prestige bonuses and the like).
    pub global_speed_multiplier: f64,
    /// Tick-clock milliseconds per game hour of travel.
    pub ms_per_game_hour: f64,
    /// Emit a notification when a mission starts waiting.
    pub notify_waits: bool,
    pub colonization: ColonizationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            global_speed_multiplier: 1.0,
            ms_per_game_hour: DEFAULT_MS_PER_GAME_HOUR,
            notify_waits: true,
            colonization: ColonizationConfig::default(),
        }
    }
}

/// Colony founding rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonizationConfig {
    /// Minimum delivered cargo before a colony can be founded.
    pub requirements: ResourceMap,
    /// Founding population when requirements are met exactly.
    pub base_population: u64,
    /// Cap on the population bonus from over-delivery.
    pub max_population_multiplier: f64,
    /// How many times a short run may pull the shortfall from its origin.
    pub max_auto_source_rounds: u32,
}

impl Default for ColonizationConfig {
    fn default() -> Self {
        Self {
            requirements: ResourceMap::from_pairs(&[
                (ResourceKind::Steel, 100.0),
                (ResourceKind::Glass, 50.0),
                (ResourceKind::Food, 100.0),
                (ResourceKind::Water, 50.0),
            ]),
            base_population: 1_000,
            max_population_multiplier: 2.0,
            max_auto_source_rounds: 3,
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("global_speed_multiplier must be positive (got {0})")]
    NonPositiveSpeedMultiplier(f64),
    #[error("ms_per_game_hour must be positive (got {0})")]
    NonPositiveHourLength(f64),
    #[error("colonization requirements are empty")]
    EmptyRequirements,
    #[error("colonization requirement for {0} is negative")]
    NegativeRequirement(ResourceKind),
    #[error("colonization base_population must be at least 1")]
    ZeroBasePopulation,
    #[error("max_population_multiplier must be at least 1.0 (got {0})")]
    MultiplierBelowOne(f64),
}

impl EngineConfig {
    /// Validate the configuration, returning all errors found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.global_speed_multiplier.is_nan() || self.global_speed_multiplier <= 0.0 {
            errors.push(ConfigError::NonPositiveSpeedMultiplier(
                self.global_speed_multiplier,
            ));
        }
        if self.ms_per_game_hour.is_nan() || self.ms_per_game_hour <= 0.0 {
            errors.push(ConfigError::NonPositiveHourLength(self.ms_per_game_hour));
        }

        let colonization = &self.colonization;
        for kind in ResourceKind::ALL {
            if colonization.requirements.get(kind) < 0.0 {
                errors.push(ConfigError::NegativeRequirement(kind));
            }
        }
        if colonization.requirements.is_empty() {
            errors.push(ConfigError::EmptyRequirements);
        }
        if colonization.base_population == 0 {
            errors.push(ConfigError::ZeroBasePopulation);
        }
        if colonization.max_population_multiplier < 1.0 {
            errors.push(ConfigError::MultiplierBelowOne(
                colonization.max_population_multiplier,
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_empty());
    }

    #[test]
    fn test_default_requirements() {
        let req = ColonizationConfig::default().requirements;
        assert_eq!(req.get(ResourceKind::Steel), 100.0);
        assert_eq!(req.get(ResourceKind::Glass), 50.0);
        assert_eq!(req.get(ResourceKind::Food), 100.0);
        assert_eq!(req.get(ResourceKind::Water), 50.0);
        assert_eq!(req.total(), 300.0);
    }

    #[test]
    fn test_collects_every_error() {
        let config = EngineConfig {
            global_speed_multiplier: 0.0,
            ms_per_game_hour: -1.0,
            notify_waits: true,
            colonization: ColonizationConfig {
                requirements: ResourceMap::new(),
                base_population: 0,
                max_population_multiplier: 0.5,
                max_auto_source_rounds: 0,
            },
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ConfigError::EmptyRequirements));
    }

    #[test]
    fn test_error_messages_are_readable() {
        let msg = ConfigError::NonPositiveSpeedMultiplier(0.0).to_string();
        assert!(msg.contains("global_speed_multiplier"));
    }
}
