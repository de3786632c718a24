//! Engine tuning surface loaded from JSON with per-field defaults.

use serde::{Deserialize, Serialize};

use crate::constants::ENV_SHOW_TEST_EVENTS;
use crate::error::ConfigError;

/// Stat thresholds that end a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "Thresholds::default_debt_floor")]
    pub debt_floor: f64,
    #[serde(default = "Thresholds::default_fame_ceiling")]
    pub fame_ceiling: f64,
    #[serde(default = "Thresholds::default_max_age")]
    pub max_age: f64,
}

impl Thresholds {
    #[must_use]
    pub const fn default_debt_floor() -> f64 {
        -5000.0
    }

    #[must_use]
    pub const fn default_fame_ceiling() -> f64 {
        100.0
    }

    #[must_use]
    pub const fn default_max_age() -> f64 {
        100.0
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            debt_floor: Self::default_debt_floor(),
            fame_ceiling: Self::default_fame_ceiling(),
            max_age: Self::default_max_age(),
        }
    }
}

/// Per-turn aging and the decay it brings past certain ages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingConfig {
    #[serde(default = "AgingConfig::default_age_per_turn")]
    pub age_per_turn: f64,
    #[serde(default = "AgingConfig::default_health_decay_age")]
    pub health_decay_age: f64,
    #[serde(default = "AgingConfig::default_health_decay")]
    pub health_decay: f64,
    #[serde(default = "AgingConfig::default_sanity_decay_age")]
    pub sanity_decay_age: f64,
    #[serde(default = "AgingConfig::default_sanity_decay")]
    pub sanity_decay: f64,
}

impl AgingConfig {
    #[must_use]
    pub const fn default_age_per_turn() -> f64 {
        0.5
    }

    #[must_use]
    pub const fn default_health_decay_age() -> f64 {
        30.0
    }

    #[must_use]
    pub const fn default_health_decay() -> f64 {
        0.1
    }

    #[must_use]
    pub const fn default_sanity_decay_age() -> f64 {
        20.0
    }

    #[must_use]
    pub const fn default_sanity_decay() -> f64 {
        0.05
    }
}

impl Default for AgingConfig {
    fn default() -> Self {
        Self {
            age_per_turn: Self::default_age_per_turn(),
            health_decay_age: Self::default_health_decay_age(),
            health_decay: Self::default_health_decay(),
            sanity_decay_age: Self::default_sanity_decay_age(),
            sanity_decay: Self::default_sanity_decay(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Include `test`-tagged events in selection.
    #[serde(default)]
    pub show_test_events: bool,
    #[serde(default = "EngineConfig::default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default = "EngineConfig::default_manual_choice_count")]
    pub manual_choice_count: usize,
    #[serde(default = "EngineConfig::default_special_choice_chance")]
    pub special_choice_chance: f64,
    /// Upper bound of the uniform impulse added to autonomous choice scores.
    #[serde(default = "EngineConfig::default_choice_chaos")]
    pub choice_chaos: f64,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub aging: AgingConfig,
}

impl EngineConfig {
    #[must_use]
    pub const fn default_log_capacity() -> usize {
        50
    }

    #[must_use]
    pub const fn default_manual_choice_count() -> usize {
        3
    }

    #[must_use]
    pub const fn default_special_choice_chance() -> f64 {
        0.5
    }

    #[must_use]
    pub const fn default_choice_chaos() -> f64 {
        40.0
    }

    /// Parse configuration from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the JSON is malformed or violates invariants.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_capacity == 0 {
            return Err(ConfigError::ZeroLogCapacity);
        }
        if !(0.0..=1.0).contains(&self.special_choice_chance) {
            return Err(ConfigError::RangeViolation {
                field: "special_choice_chance",
                min: 0.0,
                max: 1.0,
                value: self.special_choice_chance,
            });
        }
        if !self.choice_chaos.is_finite() || self.choice_chaos < 0.0 {
            return Err(ConfigError::MinViolation {
                field: "choice_chaos",
                min: 0.0,
                value: self.choice_chaos,
            });
        }
        if !self.aging.age_per_turn.is_finite() || self.aging.age_per_turn < 0.0 {
            return Err(ConfigError::MinViolation {
                field: "aging.age_per_turn",
                min: 0.0,
                value: self.aging.age_per_turn,
            });
        }
        Ok(())
    }

    /// Apply environment overrides on top of the loaded values.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(ENV_SHOW_TEST_EVENTS) {
            self.show_test_events = parse_flag(&raw).unwrap_or(self.show_test_events);
        }
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            show_test_events: false,
            log_capacity: Self::default_log_capacity(),
            manual_choice_count: Self::default_manual_choice_count(),
            special_choice_chance: Self::default_special_choice_chance(),
            choice_chaos: Self::default_choice_chaos(),
            thresholds: Thresholds::default(),
            aging: AgingConfig::default(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg = EngineConfig::from_json(r#"{"thresholds": {"debt_floor": -2000}}"#).unwrap();
        assert!((cfg.thresholds.debt_floor + 2000.0).abs() < f64::EPSILON);
        assert!((cfg.thresholds.max_age - 100.0).abs() < f64::EPSILON);
        assert_eq!(cfg.log_capacity, 50);
        assert_eq!(cfg.manual_choice_count, 3);
        assert!(!cfg.show_test_events);
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let cfg = EngineConfig {
            special_choice_chance: 1.5,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RangeViolation { field: "special_choice_chance", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"log_capacity": 0}"#),
            Err(ConfigError::ZeroLogCapacity)
        ));
        assert!(matches!(
            EngineConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn flag_parsing_accepts_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
