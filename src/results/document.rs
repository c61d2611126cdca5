use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ResultsError;
use crate::job::{Measurement, MeasurementMetadata};
use crate::stats::Statistics;

use super::aggregate::MeasurementSummary;

/// Reduced results of one logical job across its connections and iterations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobResult {
    pub results: Vec<MeasurementSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MeasurementMetadata>,
    /// Raw measurements, one list per connection and iteration.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub measurements: Vec<Vec<Measurement>>,
    pub environment: serde_json::Map<String, serde_json::Value>,
}

/// Output document for a whole session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobResults {
    pub jobs: BTreeMap<String, JobResult>,
    pub properties: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
}

impl JobResults {
    /// Pretty-printed JSON form of the document.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization fails.
    pub fn to_json(&self) -> Result<String, ResultsError> {
        serde_json::to_string_pretty(self).map_err(|source| ResultsError::Serialize { source })
    }

    /// # Errors
    ///
    /// Returns an error when the document cannot be serialized or written.
    pub async fn write_to(&self, path: &Path) -> Result<(), ResultsError> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ResultsError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|source| ResultsError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Results saved in '{}'", path.display());
        Ok(())
    }
}
