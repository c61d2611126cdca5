use std::path::PathBuf;

use thiserror::Error;

use crate::job::JobState;

/// Agent-reported field that must be present before a job may start.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AgentField {
    #[error("hardware")]
    Hardware,
    #[error("hardwareVersion")]
    HardwareVersion,
    #[error("operatingSystem")]
    OperatingSystem,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error(
        "Invalid agent version ({actual}), the agent must be updated to protocol version {required} or later."
    )]
    UnsupportedAgentVersion { actual: u32, required: u32 },
    #[error("Agent is required to set job field '{field}'.")]
    MissingAgentField { field: AgentField },
    #[error("Job '{job}' failed on the agent: {message}")]
    RemoteFailure { job: String, message: String },
    #[error("Job '{job}' stopped before it was running.")]
    UnexpectedStop { job: String },
    #[error("Job not found at {uri}.")]
    JobNotFound { uri: String },
    #[error("Agent response to job submission had no Location header.")]
    MissingLocation,
    #[error("Invalid job location '{location}': {source}")]
    InvalidLocation {
        location: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid agent endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{method} {uri} failed: {source}")]
    Request {
        method: &'static str,
        uri: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {uri} returned status {status}: {body}")]
    Status {
        method: &'static str,
        uri: String,
        status: u16,
        body: String,
    },
    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Job state moved backwards from {from} to {to}.")]
    StateRegression { from: JobState, to: JobState },
    #[error("Failed to read attachment '{path}': {source}")]
    ReadAttachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Attachment '{path}' could not be found.")]
    AttachmentNotFound { path: PathBuf },
    #[error("Job '{job}' has not been submitted.")]
    NotSubmitted { job: String },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}

impl JobError {
    /// Network failures worth retrying: connection resets, timeouts and
    /// gateway-style statuses.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            JobError::Request { source, .. } => {
                source.is_connect() || source.is_timeout() || source.is_request()
            }
            JobError::Status { status, .. } => matches!(status, 502..=504),
            JobError::UnsupportedAgentVersion { .. }
            | JobError::MissingAgentField { .. }
            | JobError::RemoteFailure { .. }
            | JobError::UnexpectedStop { .. }
            | JobError::JobNotFound { .. }
            | JobError::MissingLocation
            | JobError::InvalidLocation { .. }
            | JobError::InvalidEndpoint { .. }
            | JobError::Decode { .. }
            | JobError::StateRegression { .. }
            | JobError::ReadAttachment { .. }
            | JobError::AttachmentNotFound { .. }
            | JobError::NotSubmitted { .. } => false,
            #[cfg(test)]
            JobError::TestExpectation { .. } | JobError::TestExpectationValue { .. } => false,
        }
    }
}
