//! Engine configuration, persisted as TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock tuning. Delivery-status thresholds are deliberately absent: dashboards
//! depend on their exact values and they live as constants in [`crate::delivery`].

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default waiting-cost threshold above which a high-risk delay trips the breaker.
pub const DEFAULT_SUSPEND_THRESHOLD: f64 = 50_000.0;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Reference date for forecasts. `None` means today (UTC).
    pub as_of: Option<NaiveDate>,
    /// Wall-clock budget for a single forecast or graph analysis.
    pub analysis_timeout_ms: Option<u64>,
    pub forecast: ForecastConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

/// Tuning for the resource load forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Future months forecast when the caller does not ask for a horizon.
    pub horizon_months: u32,
    /// Past months (including the current one) used as the observed series.
    pub history_months: u32,
    /// Trailing history values averaged into the moving-average component.
    pub moving_average_window: usize,
    /// Share of the moving average in the blended forecast; the rest is the trend line.
    pub blend_weight: f64,
    /// Minimum slope magnitude (units per month) classified as a trend.
    pub trend_threshold: f64,
    /// Lowest confidence ever reported.
    pub confidence_floor: f64,
    /// Share of capacity below which a resource counts as underused.
    pub low_utilization_ratio: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_months: 6,
            history_months: 6,
            moving_average_window: 3,
            blend_weight: 0.5,
            trend_threshold: 0.1,
            confidence_floor: 30.0,
            low_utilization_ratio: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    /// Total waiting cost that must be exceeded before suspension is recommended.
    pub suspend_threshold: f64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            suspend_threshold: DEFAULT_SUSPEND_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.forecast;
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if !(0.0..=1.0).contains(&f.blend_weight) {
            return invalid(format!("forecast.blendWeight {} is outside [0, 1]", f.blend_weight));
        }
        if f.history_months == 0 {
            return invalid("forecast.historyMonths must be at least 1".into());
        }
        if f.moving_average_window == 0 {
            return invalid("forecast.movingAverageWindow must be at least 1".into());
        }
        if f.trend_threshold < 0.0 {
            return invalid(format!("forecast.trendThreshold {} is negative", f.trend_threshold));
        }
        if !(0.0..=100.0).contains(&f.confidence_floor) {
            return invalid(format!(
                "forecast.confidenceFloor {} is outside [0, 100]",
                f.confidence_floor
            ));
        }
        if f.low_utilization_ratio < 0.0 {
            return invalid(format!(
                "forecast.lowUtilizationRatio {} is negative",
                f.low_utilization_ratio
            ));
        }
        if self.circuit_breaker.suspend_threshold < 0.0 {
            return invalid(format!(
                "circuitBreaker.suspendThreshold {} is negative",
                self.circuit_breaker.suspend_threshold
            ));
        }
        Ok(())
    }

    /// The configured reference date, or today.
    pub fn as_of_date(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| chrono::Utc::now().date_naive())
    }

    pub fn analysis_timeout(&self) -> Option<Duration> {
        self.analysis_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.circuit_breaker.suspend_threshold, 50_000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            asOf = "2024-03-15"
            analysisTimeoutMs = 250

            [forecast]
            horizonMonths = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.as_of, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(config.analysis_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.forecast.horizon_months, 12);
        assert_eq!(config.forecast.history_months, 6);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<EngineConfig, _> = toml::from_str("horizon = 3");
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = EngineConfig::default();
        config.forecast.blend_weight = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = EngineConfig::default();
        config.forecast.moving_average_window = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.circuit_breaker.suspend_threshold = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_roundtrip_preserves_tuning() {
        let mut config = EngineConfig::default();
        config.forecast.trend_threshold = 0.25;
        let text = config.to_toml().unwrap();
        let back: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pmo.toml");
        std::fs::write(&path, "[forecast\n").unwrap();
        match EngineConfig::load(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert!(p.ends_with("pmo.toml")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
