//! Runtime configuration, loadable from JSON.
//!
//! Every group has defaults, so a partial document such as
//! `{"buffer": {"capacity": 2000}}` is valid. `validate` is the single place
//! where numeric invariants are enforced; components validate again at their
//! own boundaries.

use crate::data_types::Padding;
use crate::error::{ConfigurationError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub bucket_width_ms: i64,
    /// Inputs at or above this size are grouped on the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            bucket_width_ms: 1_000,
            parallel_threshold: 50_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub refresh_rate_hz: f64,
    pub target_fps: f64,
    pub padding: Padding,
    pub point_radius: f32,
    pub decimate: bool,
    pub grid_ticks: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 60.0,
            target_fps: 60.0,
            padding: Padding {
                top: 10.0,
                right: 10.0,
                bottom: 30.0,
                left: 50.0,
            },
            point_radius: 2.0,
            decimate: true,
            grid_ticks: 8,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub interval_ms: u64,
    pub batch_size: usize,
    pub initial_batch_size: usize,
    pub categories: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            batch_size: 10,
            initial_batch_size: 1_000,
            categories: vec!["cpu".into(), "memory".into(), "network".into()],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub frame_window_ms: u64,
    pub memory_samples: usize,
    pub min_samples_for_growth: usize,
    pub memory_interval_ms: u64,
    pub growth_threshold_mb: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            frame_window_ms: 1_000,
            memory_samples: 60,
            min_samples_for_growth: 10,
            memory_interval_ms: 1_000,
            growth_threshold_mb: 50.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub row_extent: f64,
    pub viewport_extent: f64,
    pub overscan: usize,
    pub scroll_throttle_ms: u64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_extent: 40.0,
            viewport_extent: 400.0,
            overscan: 3,
            scroll_throttle_ms: 16,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub debounce_ms: u64,
    pub max_wait_ms: u64,
    pub auto_fit_margin: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            max_wait_ms: 500,
            auto_fit_margin: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub buffer: BufferConfig,
    pub aggregation: AggregationConfig,
    pub render: RenderConfig,
    pub ingest: IngestConfig,
    pub telemetry: TelemetryConfig,
    pub table: TableConfig,
    pub viewport: ViewportConfig,
    pub display_timezone: chrono_tz::Tz,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            aggregation: AggregationConfig::default(),
            render: RenderConfig::default(),
            ingest: IngestConfig::default(),
            telemetry: TelemetryConfig::default(),
            table: TableConfig::default(),
            viewport: ViewportConfig::default(),
            display_timezone: chrono_tz::Tz::UTC,
        }
    }
}

impl ChartConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer.capacity == 0 {
            return Err(ConfigurationError::InvalidCapacity(0));
        }
        if self.aggregation.bucket_width_ms <= 0 {
            return Err(ConfigurationError::NonPositiveBucketWidth(
                self.aggregation.bucket_width_ms,
            ));
        }
        crate::error::ensure_positive("render.refresh_rate_hz", self.render.refresh_rate_hz)?;
        crate::error::ensure_positive("render.target_fps", self.render.target_fps)?;
        crate::error::ensure_positive("table.row_extent", self.table.row_extent)?;
        crate::error::ensure_positive("table.viewport_extent", self.table.viewport_extent)?;

        let p = &self.render.padding;
        if [p.top, p.right, p.bottom, p.left]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(ConfigurationError::InvalidConfig(
                "render.padding insets must be finite and non-negative".into(),
            ));
        }
        if self.ingest.interval_ms == 0 {
            return Err(ConfigurationError::InvalidConfig(
                "ingest.interval_ms must be positive".into(),
            ));
        }
        if self.telemetry.memory_interval_ms == 0 {
            return Err(ConfigurationError::InvalidConfig(
                "telemetry.memory_interval_ms must be positive".into(),
            ));
        }
        if self.telemetry.memory_samples < 2 {
            return Err(ConfigurationError::InvalidConfig(
                "telemetry.memory_samples must keep at least two samples".into(),
            ));
        }
        if self.telemetry.min_samples_for_growth < 2
            || self.telemetry.min_samples_for_growth > self.telemetry.memory_samples
        {
            return Err(ConfigurationError::InvalidConfig(format!(
                "telemetry.min_samples_for_growth must be within 2..={}",
                self.telemetry.memory_samples
            )));
        }
        if self.viewport.max_wait_ms < self.viewport.debounce_ms {
            return Err(ConfigurationError::InvalidConfig(
                "viewport.max_wait_ms must not be shorter than viewport.debounce_ms".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.viewport.auto_fit_margin) {
            return Err(ConfigurationError::InvalidConfig(
                "viewport.auto_fit_margin must be within [0, 1)".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_fills_defaults() {
        let config = ChartConfig::from_json_str(r#"{"buffer": {"capacity": 250}}"#).unwrap();
        assert_eq!(config.buffer.capacity, 250);
        assert_eq!(config.aggregation, AggregationConfig::default());
        assert_eq!(config.display_timezone, chrono_tz::Tz::UTC);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = ChartConfig::from_json_str(r#"{"buffer": {"capacity": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidCapacity(0)));
    }

    #[test]
    fn json_round_trip_keeps_timezone() {
        let mut config = ChartConfig::default();
        config.display_timezone = chrono_tz::Europe::Paris;
        let text = config.to_json_string().unwrap();
        let back = ChartConfig::from_json_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
