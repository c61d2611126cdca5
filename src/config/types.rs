use std::collections::BTreeMap;

use serde::Deserialize;

use crate::job::JobRecord;

/// One job template plus the agents it runs on. Every other key is read as
/// a [`JobRecord`] field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDefinition {
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(flatten)]
    pub job: JobRecord,
}

/// Driver configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub jobs: BTreeMap<String, JobDefinition>,
    /// Scenario name to job names, in dependency order.
    pub scenarios: BTreeMap<String, Vec<String>>,
}
