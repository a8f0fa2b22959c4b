// Propscope
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Configuration for the tracker, the analysis engine and the monitoring bus

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Maximum number of previous values kept per attribute
    pub max_history: usize,
    /// Maximum number of observation timestamps kept per attribute
    pub max_timestamps: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_history: 50,
            max_timestamps: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// How long a computed snapshot may be served from cache
    pub cache_window_ms: u64,
    /// Idle time required after the last observation before the cache is trusted
    pub quiet_window_ms: u64,
    /// change_count / observation_count above which an attribute is a frequent updater
    pub frequent_update_ratio: f64,
    /// Relative change-count difference under which two attributes co-update
    pub co_update_tolerance: f64,
    /// Upper bound on attributes fed to the pairwise co-update pass
    pub max_correlated_attributes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cache_window_ms: 1000,
            quiet_window_ms: 16,
            frequent_update_ratio: 0.5,
            co_update_tolerance: 0.2,
            max_correlated_attributes: 2000,
        }
    }
}

impl AnalysisConfig {
    pub fn cache_window(&self) -> Duration {
        Duration::from_millis(self.cache_window_ms)
    }

    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Sampling period of the monitoring bus
    pub interval_ms: u64,
    /// Frequent-update attributes tolerated before a warning is raised
    pub max_frequent_updates: usize,
    /// Unused attributes tolerated before a warning is raised
    pub max_unused_attributes: usize,
    /// Attribute count above which a component is reported as overloaded
    pub max_attributes_per_component: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_frequent_updates: 0,
            max_unused_attributes: 0,
            max_attributes_per_component: 10,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropscopeConfig {
    pub tracker: TrackerConfig,
    pub analysis: AnalysisConfig,
    pub monitor: MonitorConfig,
}

impl PropscopeConfig {
    /// Defaults overridden by `PROPSCOPE_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each known key.
    /// Unparseable values are logged and skipped.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        override_from(&lookup, "PROPSCOPE_MAX_HISTORY", &mut config.tracker.max_history);
        override_from(&lookup, "PROPSCOPE_MAX_TIMESTAMPS", &mut config.tracker.max_timestamps);

        override_from(&lookup, "PROPSCOPE_CACHE_WINDOW_MS", &mut config.analysis.cache_window_ms);
        override_from(&lookup, "PROPSCOPE_QUIET_WINDOW_MS", &mut config.analysis.quiet_window_ms);
        override_from(&lookup, "PROPSCOPE_FREQUENT_UPDATE_RATIO", &mut config.analysis.frequent_update_ratio);
        override_from(&lookup, "PROPSCOPE_CO_UPDATE_TOLERANCE", &mut config.analysis.co_update_tolerance);
        override_from(&lookup, "PROPSCOPE_MAX_CORRELATED_ATTRIBUTES", &mut config.analysis.max_correlated_attributes);

        override_from(&lookup, "PROPSCOPE_MONITOR_INTERVAL_MS", &mut config.monitor.interval_ms);
        override_from(&lookup, "PROPSCOPE_MAX_FREQUENT_UPDATES", &mut config.monitor.max_frequent_updates);
        override_from(&lookup, "PROPSCOPE_MAX_UNUSED_ATTRIBUTES", &mut config.monitor.max_unused_attributes);
        override_from(&lookup, "PROPSCOPE_MAX_ATTRIBUTES_PER_COMPONENT", &mut config.monitor.max_attributes_per_component);

        config
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.tracker.max_history == 0 {
            return Err(invalid("tracker.max_history", "must be greater than zero"));
        }
        if self.tracker.max_timestamps == 0 {
            return Err(invalid("tracker.max_timestamps", "must be greater than zero"));
        }
        if !(self.analysis.frequent_update_ratio > 0.0 && self.analysis.frequent_update_ratio <= 1.0) {
            return Err(invalid("analysis.frequent_update_ratio", "must be within (0, 1]"));
        }
        if !(self.analysis.co_update_tolerance > 0.0 && self.analysis.co_update_tolerance <= 1.0) {
            return Err(invalid("analysis.co_update_tolerance", "must be within (0, 1]"));
        }
        if self.analysis.max_correlated_attributes == 0 {
            return Err(invalid("analysis.max_correlated_attributes", "must be greater than zero"));
        }
        if self.monitor.interval_ms == 0 {
            return Err(invalid("monitor.interval_ms", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

fn override_from<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring invalid {} '{}', using default", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = PropscopeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analysis.cache_window(), Duration::from_millis(1000));
        assert_eq!(config.analysis.quiet_window(), Duration::from_millis(16));
        assert_eq!(config.monitor.max_attributes_per_component, 10);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PROPSCOPE_CACHE_WINDOW_MS", "250"),
            ("PROPSCOPE_CO_UPDATE_TOLERANCE", "0.1"),
            ("PROPSCOPE_MAX_HISTORY", " 8 "),
        ]);
        let config = PropscopeConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.analysis.cache_window_ms, 250);
        assert_eq!(config.analysis.co_update_tolerance, 0.1);
        assert_eq!(config.tracker.max_history, 8);
        assert_eq!(config.monitor, MonitorConfig::default());
    }

    #[test]
    fn test_from_lookup_ignores_malformed_values() {
        let config = PropscopeConfig::from_lookup(|key| match key {
            "PROPSCOPE_QUIET_WINDOW_MS" => Some("soon".to_string()),
            "PROPSCOPE_MONITOR_INTERVAL_MS" => Some("-5".to_string()),
            _ => None,
        });

        assert_eq!(config.analysis.quiet_window_ms, 16);
        assert_eq!(config.monitor.interval_ms, 1000);
    }

    #[test]
    fn test_validate_rejects_bad_ratios() {
        let mut config = PropscopeConfig::default();
        config.analysis.co_update_tolerance = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "analysis.co_update_tolerance",
                reason: "must be within (0, 1]".to_string(),
            })
        );

        let mut config = PropscopeConfig::default();
        config.monitor.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde_round_trip_keeps_sections() {
        let json = serde_json::to_string(&PropscopeConfig::default()).unwrap();
        let parsed: PropscopeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, PropscopeConfig::default());
    }
}
