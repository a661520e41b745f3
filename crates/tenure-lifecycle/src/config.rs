//! # Engine Configuration
//!
//! Loaded from YAML, then overridden from the environment:
//!
//! ```yaml
//! utc_offset_minutes: 420      # operational timezone, minutes east of UTC
//! enforce_unique_products: true
//! ```
//!
//! | Variable | Field |
//! |---|---|
//! | `TENURE_UTC_OFFSET_MINUTES` | `utc_offset_minutes` |
//! | `TENURE_ENFORCE_UNIQUE` | `enforce_unique_products` |

use serde::{Deserialize, Serialize};

use tenure_core::temporal::MAX_UTC_OFFSET_MINUTES;
use tenure_core::BusinessCalendar;

use crate::error::LifecycleError;

/// Environment variable overriding [`EngineConfig::utc_offset_minutes`].
pub const ENV_UTC_OFFSET_MINUTES: &str = "TENURE_UTC_OFFSET_MINUTES";

/// Environment variable overriding [`EngineConfig::enforce_unique_products`].
pub const ENV_ENFORCE_UNIQUE: &str = "TENURE_ENFORCE_UNIQUE";

/// Lifecycle engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Offset of the operational timezone from UTC, in minutes. Every
    /// day-boundary computation uses this single offset.
    pub utc_offset_minutes: i32,
    /// Reject creation of a second live instance of a unique product.
    pub enforce_unique_products: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            enforce_unique_products: true,
        }
    }
}

impl EngineConfig {
    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, LifecycleError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| LifecycleError::Config(e.to_string()))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), LifecycleError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), LifecycleError> {
        if let Some(raw) = lookup(ENV_UTC_OFFSET_MINUTES) {
            self.utc_offset_minutes = raw.trim().parse().map_err(|_| {
                LifecycleError::Config(format!(
                    "{ENV_UTC_OFFSET_MINUTES} must be an integer, got {raw:?}"
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_ENFORCE_UNIQUE) {
            self.enforce_unique_products = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(LifecycleError::Config(format!(
                        "{ENV_ENFORCE_UNIQUE} must be a boolean, got {raw:?}"
                    )))
                }
            };
        }
        Ok(())
    }

    /// Validate the configuration. Returns a list of error messages (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.utc_offset_minutes.unsigned_abs() > MAX_UTC_OFFSET_MINUTES.unsigned_abs() {
            errors.push(format!(
                "utc_offset_minutes ({}) must be within ±{MAX_UTC_OFFSET_MINUTES}",
                self.utc_offset_minutes
            ));
        }
        errors
    }

    /// The calendar for the configured timezone.
    pub fn calendar(&self) -> Result<BusinessCalendar, LifecycleError> {
        Ok(BusinessCalendar::with_offset_minutes(self.utc_offset_minutes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.utc_offset_minutes, 0);
        assert!(cfg.enforce_unique_products);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn test_yaml_partial_document() {
        let cfg = EngineConfig::from_yaml_str("utc_offset_minutes: 420\n").unwrap();
        assert_eq!(cfg.utc_offset_minutes, 420);
        assert!(cfg.enforce_unique_products);
        assert_eq!(EngineConfig::from_yaml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_yaml_rejects_unknown_field() {
        assert!(EngineConfig::from_yaml_str("timezone: Asia/Tokyo\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_UTC_OFFSET_MINUTES, "-300"),
            (ENV_ENFORCE_UNIQUE, "false"),
        ]
        .into_iter()
        .collect();
        let mut cfg = EngineConfig::default();
        cfg.apply_env_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.utc_offset_minutes, -300);
        assert!(!cfg.enforce_unique_products);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let mut cfg = EngineConfig::default();
        let err = cfg
            .apply_env_from(|k| (k == ENV_ENFORCE_UNIQUE).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_ENFORCE_UNIQUE));
    }

    #[test]
    fn test_validate_offset_range() {
        let cfg = EngineConfig {
            utc_offset_minutes: 20 * 60,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate().len(), 1);
        assert!(cfg.calendar().is_err());

        // ── extremes report instead of overflowing ──
        for utc_offset_minutes in [i32::MIN, i32::MAX] {
            let cfg = EngineConfig {
                utc_offset_minutes,
                ..EngineConfig::default()
            };
            assert_eq!(cfg.validate().len(), 1);
            assert!(cfg.calendar().is_err());
        }
    }

    #[test]
    fn test_json_field_names() {
        let value = serde_json::to_value(EngineConfig::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "utc_offset_minutes": 0,
                "enforce_unique_products": true,
            })
        );
    }
}
