//! Resource manager configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for the resource manager and its memory monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Monitor tick period in milliseconds
    pub monitor_interval_ms: u64,
    /// Used/total ratio above which tabs are suspended
    pub pressure_threshold: f64,
    /// Upper bound on tabs suspended per monitor tick
    pub max_suspensions_per_cycle: usize,
    /// Fraction of a tab's footprint kept after suspension
    pub suspended_memory_ratio: f64,
    /// Reject `create_tab_process` for an already registered tab id
    pub reject_duplicate_tabs: bool,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            monitor_interval_ms: 30_000,
            pressure_threshold: 0.8,
            max_suspensions_per_cycle: 3,
            suspended_memory_ratio: 0.1,
            reject_duplicate_tabs: false,
        }
    }
}

impl ResourceConfig {
    /// Create configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            monitor_interval_ms: std::env::var("RK_MONITOR_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.monitor_interval_ms),
            pressure_threshold: std::env::var("RK_PRESSURE_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.pressure_threshold),
            max_suspensions_per_cycle: std::env::var("RK_MAX_SUSPENSIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_suspensions_per_cycle),
            suspended_memory_ratio: defaults.suspended_memory_ratio,
            reject_duplicate_tabs: std::env::var("RK_REJECT_DUPLICATE_TABS")
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.reject_duplicate_tabs),
        }
    }

    /// Monitor tick period.
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    /// Check that every field is in range.
    pub fn validate(&self) -> Result<()> {
        if self.monitor_interval_ms == 0 {
            return Err(Error::Config("monitor_interval_ms must be > 0".into()));
        }
        if !(self.pressure_threshold > 0.0 && self.pressure_threshold <= 1.0) {
            return Err(Error::Config(format!(
                "pressure_threshold must be in (0, 1], got {}",
                self.pressure_threshold
            )));
        }
        if !(self.suspended_memory_ratio > 0.0 && self.suspended_memory_ratio <= 0.1) {
            return Err(Error::Config(format!(
                "suspended_memory_ratio must be in (0, 0.1], got {}",
                self.suspended_memory_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ResourceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.monitor_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let config = ResourceConfig {
            pressure_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_ratio_above_ten_percent() {
        let config = ResourceConfig {
            suspended_memory_ratio: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ResourceConfig =
            serde_json::from_str(r#"{"pressure_threshold": 0.9}"#).unwrap();
        assert_eq!(config.pressure_threshold, 0.9);
        assert_eq!(config.max_suspensions_per_cycle, 3);
    }
}
