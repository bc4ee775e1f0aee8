//! Configuration types

use crate::{ConfigError, ContentType};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default maximum cache lifetime in seconds (one day).
pub const DEFAULT_MAX_CACHE_LIFETIME: u64 = 86_400;

/// Default harmonization tolerance in seconds.
pub const DEFAULT_HARMONIZATION_TOLERANCE: i64 = 3_600;

/// Default scoping strategy name.
pub const DEFAULT_SCOPING_STRATEGY: &str = "per-page";

/// Default timing strategy name.
pub const DEFAULT_TIMING_STRATEGY: &str = "dynamic";

/// Timestamp harmonization settings.
///
/// Malformed slot entries and negative tolerances are not errors: the
/// harmonization engine ignores what it cannot use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonizationConfig {
    pub enabled: bool,
    /// Daily slots as `"HH:MM"` strings.
    pub slots: Vec<String>,
    /// Maximum shift in seconds.
    pub tolerance: i64,
    /// Offset from UTC, in seconds, used to compute the time of day.
    pub utc_offset: i32,
}

impl Default for HarmonizationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            slots: ["00:00", "06:00", "12:00", "18:00"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tolerance: DEFAULT_HARMONIZATION_TOLERANCE,
            utc_offset: 0,
        }
    }
}

impl HarmonizationConfig {
    /// Enabled configuration with the given slots and tolerance.
    pub fn with_slots<I, S>(slots: I, tolerance: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            slots: slots.into_iter().map(Into::into).collect(),
            tolerance,
            utc_offset: 0,
        }
    }

    /// Tolerance actually applied. Negative values fall back to the default.
    pub fn effective_tolerance(&self) -> i64 {
        if self.tolerance < 0 {
            DEFAULT_HARMONIZATION_TOLERANCE
        } else {
            self.tolerance
        }
    }

    /// Offset used for time-of-day math. Out of range values mean UTC.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset).unwrap_or_else(|| Utc.fix())
    }
}

/// Master configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    pub scoping_strategy: String,
    pub timing_strategy: String,
    /// Upper bound for pull-mode cache lifetimes, in seconds.
    pub max_cache_lifetime: u64,
    pub use_reference_index: bool,
    /// Hybrid timing rules keyed by content type (`page`, `content`).
    pub timing_rules: BTreeMap<String, String>,
    pub harmonization: HarmonizationConfig,
}

impl Default for TempoConfig {
    fn default() -> Self {
        let mut timing_rules = BTreeMap::new();
        timing_rules.insert(ContentType::Page.as_str().to_string(), "dynamic".to_string());
        timing_rules.insert(
            ContentType::Content.as_str().to_string(),
            "scheduler".to_string(),
        );

        Self {
            scoping_strategy: DEFAULT_SCOPING_STRATEGY.to_string(),
            timing_strategy: DEFAULT_TIMING_STRATEGY.to_string(),
            max_cache_lifetime: DEFAULT_MAX_CACHE_LIFETIME,
            use_reference_index: true,
            timing_rules,
            harmonization: HarmonizationConfig::default(),
        }
    }
}

impl TempoConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `TEMPO_SCOPING_STRATEGY`: `global`, `per-page` or `per-content` (default: per-page)
    /// - `TEMPO_TIMING_STRATEGY`: `dynamic`, `scheduler` or `hybrid` (default: dynamic)
    /// - `TEMPO_MAX_CACHE_LIFETIME`: seconds (default: 86400)
    /// - `TEMPO_USE_REFERENCE_INDEX`: `true`/`false` (default: true)
    /// - `TEMPO_TIMING_RULE_PAGE`, `TEMPO_TIMING_RULE_CONTENT`: hybrid rules
    /// - `TEMPO_HARMONIZATION_ENABLED`: `true`/`false` (default: false)
    /// - `TEMPO_HARMONIZATION_SLOTS`: comma separated `HH:MM` list
    /// - `TEMPO_HARMONIZATION_TOLERANCE`: seconds (default: 3600)
    /// - `TEMPO_UTC_OFFSET`: seconds east of UTC (default: 0)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`TempoConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse_bool = |s: String| s.to_lowercase() != "false" && s != "0";

        let mut timing_rules = defaults.timing_rules.clone();
        for content_type in [ContentType::Page, ContentType::Content] {
            let key = format!("TEMPO_TIMING_RULE_{}", content_type.as_str().to_uppercase());
            if let Some(rule) = lookup(&key) {
                timing_rules.insert(content_type.as_str().to_string(), rule);
            }
        }

        let harmonization = HarmonizationConfig {
            enabled: lookup("TEMPO_HARMONIZATION_ENABLED")
                .map(parse_bool)
                .unwrap_or(defaults.harmonization.enabled),
            slots: lookup("TEMPO_HARMONIZATION_SLOTS")
                .map(|s| {
                    s.split(',')
                        .map(|slot| slot.trim().to_string())
                        .filter(|slot| !slot.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.harmonization.slots),
            tolerance: lookup("TEMPO_HARMONIZATION_TOLERANCE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.harmonization.tolerance),
            utc_offset: lookup("TEMPO_UTC_OFFSET")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.harmonization.utc_offset),
        };

        Self {
            scoping_strategy: lookup("TEMPO_SCOPING_STRATEGY").unwrap_or(defaults.scoping_strategy),
            timing_strategy: lookup("TEMPO_TIMING_STRATEGY").unwrap_or(defaults.timing_strategy),
            max_cache_lifetime: lookup("TEMPO_MAX_CACHE_LIFETIME")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_cache_lifetime),
            use_reference_index: lookup("TEMPO_USE_REFERENCE_INDEX")
                .map(parse_bool)
                .unwrap_or(defaults.use_reference_index),
            timing_rules,
            harmonization,
        }
    }

    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::ParseFailed {
            reason: e.to_string(),
        })
    }

    /// Validate the configuration.
    ///
    /// Strategy names are checked by the strategy factories and harmonization
    /// settings are never rejected; this only catches values no component can
    /// work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cache_lifetime == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_cache_lifetime".to_string(),
                value: self.max_cache_lifetime.to_string(),
                reason: "max_cache_lifetime must be positive".to_string(),
            });
        }

        for (field, value) in [
            ("scoping_strategy", &self.scoping_strategy),
            ("timing_strategy", &self.timing_strategy),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.clone(),
                    reason: "strategy name must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn scoping_strategy(&self) -> &str {
        &self.scoping_strategy
    }

    pub fn timing_strategy(&self) -> &str {
        &self.timing_strategy
    }

    pub fn max_cache_lifetime(&self) -> u64 {
        self.max_cache_lifetime
    }

    pub fn use_reference_index(&self) -> bool {
        self.use_reference_index
    }

    pub fn harmonization(&self) -> &HarmonizationConfig {
        &self.harmonization
    }

    pub fn harmonization_enabled(&self) -> bool {
        self.harmonization.enabled
    }

    /// Hybrid timing rule for a content type, if one is configured.
    pub fn timing_rule(&self, content_type: ContentType) -> Option<&str> {
        self.timing_rules
            .get(content_type.as_str())
            .map(String::as_str)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = TempoConfig::default();
        assert_eq!(config.scoping_strategy(), "per-page");
        assert_eq!(config.timing_strategy(), "dynamic");
        assert_eq!(config.max_cache_lifetime(), 86_400);
        assert!(config.use_reference_index());
        assert!(!config.harmonization_enabled());
        assert_eq!(config.timing_rule(ContentType::Page), Some("dynamic"));
        assert_eq!(config.timing_rule(ContentType::Content), Some("scheduler"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let vars: HashMap<&str, &str> = [
            ("TEMPO_SCOPING_STRATEGY", "per-content"),
            ("TEMPO_TIMING_STRATEGY", "hybrid"),
            ("TEMPO_MAX_CACHE_LIFETIME", "3600"),
            ("TEMPO_USE_REFERENCE_INDEX", "false"),
            ("TEMPO_TIMING_RULE_CONTENT", "dynamic"),
            ("TEMPO_HARMONIZATION_ENABLED", "true"),
            ("TEMPO_HARMONIZATION_SLOTS", "08:00, 20:00,"),
            ("TEMPO_HARMONIZATION_TOLERANCE", "900"),
            ("TEMPO_UTC_OFFSET", "3600"),
        ]
        .into_iter()
        .collect();

        let config = TempoConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.scoping_strategy(), "per-content");
        assert_eq!(config.timing_strategy(), "hybrid");
        assert_eq!(config.max_cache_lifetime(), 3600);
        assert!(!config.use_reference_index());
        assert_eq!(config.timing_rule(ContentType::Content), Some("dynamic"));
        assert_eq!(config.timing_rule(ContentType::Page), Some("dynamic"));
        assert!(config.harmonization.enabled);
        assert_eq!(config.harmonization.slots, vec!["08:00", "20:00"]);
        assert_eq!(config.harmonization.tolerance, 900);
        assert_eq!(config.harmonization.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_from_lookup_ignores_unparsable_numbers() {
        let config = TempoConfig::from_lookup(|key| match key {
            "TEMPO_MAX_CACHE_LIFETIME" => Some("soon".to_string()),
            "TEMPO_HARMONIZATION_TOLERANCE" => Some("an hour".to_string()),
            _ => None,
        });

        assert_eq!(config.max_cache_lifetime(), DEFAULT_MAX_CACHE_LIFETIME);
        assert_eq!(config.harmonization.tolerance, DEFAULT_HARMONIZATION_TOLERANCE);
    }

    #[test]
    fn test_from_toml_partial_document() {
        let config = TempoConfig::from_toml_str(
            r#"
            timing_strategy = "scheduler"

            [harmonization]
            enabled = true
            slots = ["09:00", "17:30"]
            "#,
        )
        .unwrap();

        assert_eq!(config.timing_strategy(), "scheduler");
        assert_eq!(config.scoping_strategy(), DEFAULT_SCOPING_STRATEGY);
        assert!(config.harmonization_enabled());
        assert_eq!(config.harmonization.slots, vec!["09:00", "17:30"]);
        assert_eq!(config.harmonization.tolerance, DEFAULT_HARMONIZATION_TOLERANCE);
    }

    #[test]
    fn test_from_toml_rejects_broken_document() {
        let result = TempoConfig::from_toml_str("timing_strategy = ");
        assert!(matches!(result, Err(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn test_negative_tolerance_falls_back() {
        let config = HarmonizationConfig {
            tolerance: -5,
            ..HarmonizationConfig::default()
        };
        assert_eq!(config.effective_tolerance(), DEFAULT_HARMONIZATION_TOLERANCE);
    }

    #[test]
    fn test_out_of_range_offset_means_utc() {
        let config = HarmonizationConfig {
            utc_offset: 200_000,
            ..HarmonizationConfig::default()
        };
        assert_eq!(config.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_validate_rejects_zero_lifetime() {
        let config = TempoConfig {
            max_cache_lifetime: 0,
            ..TempoConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_config_serializes_to_json() {
        let config = TempoConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timing_rules"]["content"], "scheduler");
        assert_eq!(json["harmonization"]["tolerance"], 3600);
    }
}
