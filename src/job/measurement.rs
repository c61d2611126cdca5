use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operator used to fold a family of measurements into one value. The same
/// operator reduces per-run summaries across runs and iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Operation {
    #[default]
    First,
    Last,
    Avg,
    Sum,
    Median,
    Max,
    Min,
    Count,
    /// Max minus min.
    Delta,
    /// Keep every raw value.
    All,
}

/// One raw data point reported by a running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub name: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub value: serde_json::Value,
}

impl Measurement {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            timestamp: Utc::now(),
            value: value.into(),
        }
    }
}

/// Metadata format marking values that were parsed from JSON text.
pub const FORMAT_OBJECT: &str = "object";
/// Metadata format marking string values holding JSON text.
pub const FORMAT_JSON: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeasurementMetadata {
    pub name: String,
    pub source: String,
    pub short_description: String,
    pub long_description: String,
    /// Numeric format such as `n0` or `n2`; empty for free-text values.
    pub format: String,
    pub aggregate: Operation,
}

impl MeasurementMetadata {
    #[must_use]
    pub fn new(name: impl Into<String>, aggregate: Operation) -> Self {
        Self {
            name: name.into(),
            aggregate,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.short_description = description.into();
        self
    }

    /// Numeric dimension: values are converted to `f64` and formatted.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        !self.format.is_empty() && self.format != FORMAT_OBJECT && self.format != FORMAT_JSON
    }
}
