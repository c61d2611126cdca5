use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::headers::HeaderList;
use super::measurement::{Measurement, MeasurementMetadata};
use super::state::JobState;

/// Sentinel for latency statistics that were not computed.
pub const NOT_COMPUTED: f64 = -1.0;

/// Connections used when a job definition does not set any.
pub const DEFAULT_CONNECTIONS: u32 = 256;

/// Job-level latency summary in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LatencySummary {
    pub average: f64,
    pub within_p50: f64,
    pub within_p75: f64,
    pub within_p90: f64,
    pub within_p99: f64,
    pub max_latency: f64,
}

impl Default for LatencySummary {
    fn default() -> Self {
        Self {
            average: NOT_COMPUTED,
            within_p50: NOT_COMPUTED,
            within_p75: NOT_COMPUTED,
            within_p90: NOT_COMPUTED,
            within_p99: NOT_COMPUTED,
            max_latency: NOT_COMPUTED,
        }
    }
}

impl LatencySummary {
    /// Whether percentiles were computed from raw samples.
    #[must_use]
    pub fn has_percentiles(&self) -> bool {
        self.within_p50 >= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingSystem {
    Linux,
    Windows,
    #[serde(rename = "OSX")]
    Osx,
}

impl OperatingSystem {
    #[must_use]
    pub fn matches_name(self, name: &str) -> bool {
        let expected = match self {
            OperatingSystem::Linux => "linux",
            OperatingSystem::Windows => "windows",
            OperatingSystem::Osx => "osx",
        };
        name.trim().eq_ignore_ascii_case(expected)
    }
}

/// Agent endpoint an attachment is uploaded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentKind {
    /// Source archive, posted to `/source`.
    Source,
    /// Build input, posted to `/build`.
    Build,
    /// File copied next to the application output, posted to `/attachment`.
    Output,
}

impl AttachmentKind {
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            AttachmentKind::Source => "source",
            AttachmentKind::Build => "build",
            AttachmentKind::Output => "attachment",
        }
    }
}

/// A local file or directory uploaded before the remote job starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub local_path: PathBuf,
    /// Destination relative to the agent's working folder. Defaults to the
    /// local file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobOptions {
    pub attachments: Vec<Attachment>,
    pub display_output: bool,
    pub display_build: bool,
    pub discard_results: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_operating_system: Option<OperatingSystem>,
}

/// Job definition shared by the driver and the agent. Unknown fields are
/// ignored when reading so newer agents stay compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRecord {
    pub id: u64,
    pub scenario: String,
    pub state: JobState,

    pub server_version: u32,
    pub driver_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<OperatingSystem>,
    /// Externally reachable url once the job is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub wait_for_exit: bool,

    /// Seconds.
    pub duration: u64,
    /// Seconds.
    pub warmup: u64,
    /// Client-side wall-clock limit in seconds once running; 0 disables it.
    pub timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_communication_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_duration_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_benchmark_uri: Option<String>,
    pub connections: u32,
    pub threads: u32,
    pub method: String,
    pub headers: HeaderList,

    pub output: String,
    pub error: String,
    pub requests_per_second: f64,
    pub requests: u64,
    pub bad_responses: u64,
    pub socket_errors: u64,
    pub latency: LatencySummary,

    pub options: JobOptions,
    pub measurements: Vec<Measurement>,
    pub metadata: Vec<MeasurementMetadata>,
}

impl Default for JobRecord {
    fn default() -> Self {
        Self {
            id: 0,
            scenario: String::new(),
            state: JobState::New,
            server_version: 0,
            driver_version: 0,
            hardware: None,
            hardware_version: None,
            operating_system: None,
            url: None,
            wait_for_exit: false,
            duration: 0,
            warmup: 0,
            timeout: 0,
            last_communication_utc: None,
            actual_duration_ms: None,
            server_benchmark_uri: None,
            connections: DEFAULT_CONNECTIONS,
            threads: 1,
            method: "GET".to_owned(),
            headers: HeaderList::new(),
            output: String::new(),
            error: String::new(),
            requests_per_second: 0.0,
            requests: 0,
            bad_responses: 0,
            socket_errors: 0,
            latency: LatencySummary::default(),
            options: JobOptions::default(),
            measurements: Vec::new(),
            metadata: Vec::new(),
        }
    }
}

impl JobRecord {
    #[must_use]
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            ..Self::default()
        }
    }

    /// Appends a line to the accumulated output log.
    pub fn append_output(&mut self, line: &str) {
        if !self.output.is_empty() {
            self.output.push('\n');
        }
        self.output.push_str(line);
    }

    /// Appends a line to the accumulated error log.
    pub fn append_error(&mut self, line: &str) {
        if !self.error.is_empty() {
            self.error.push('\n');
        }
        self.error.push_str(line);
    }
}
