use async_trait::async_trait;

use crate::error::AppResult;
use crate::job::{JobRecord, JobState};

use super::attachments::ResolvedAttachment;

/// Result of deleting a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The agent no longer knew the job, usually because it aborted itself.
    AlreadyGone,
}

/// Which incremental log a streaming task follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Output,
    Build,
}

impl LogKind {
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            LogKind::Output => "output",
            LogKind::Build => "buildlog",
        }
    }
}

/// Wire operations against one agent. Every method targets a job uri
/// returned by [`AgentTransport::submit`], except `submit` and `info`.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Base uri of the agent, used in log lines.
    fn endpoint(&self) -> &str;

    /// Posts a job definition and returns the job uri from the `Location`
    /// response header.
    async fn submit(&self, job: &JobRecord) -> AppResult<String>;

    /// Full job record, or `None` when the agent answers 404.
    async fn fetch(&self, job_uri: &str) -> AppResult<Option<JobRecord>>;

    /// Lightweight state poll; unknown jobs and unreadable answers report
    /// [`JobState::Failed`].
    async fn state(&self, job_uri: &str) -> AppResult<JobState>;

    async fn start(&self, job_uri: &str) -> AppResult<()>;

    async fn stop(&self, job_uri: &str) -> AppResult<()>;

    async fn delete(&self, job_uri: &str) -> AppResult<DeleteOutcome>;

    async fn touch(&self, job_uri: &str) -> AppResult<()>;

    /// Streams one file to the agent endpoint of its attachment kind.
    async fn upload(
        &self,
        job_uri: &str,
        job_id: u64,
        attachment: &ResolvedAttachment,
    ) -> AppResult<()>;

    async fn reset_stats(&self, job_uri: &str) -> AppResult<()>;

    async fn flush_measurements(&self, job_uri: &str) -> AppResult<()>;

    /// Log lines past `cursor`.
    async fn log_lines(&self, job_uri: &str, kind: LogKind, cursor: usize)
    -> AppResult<Vec<String>>;

    /// Agent environment description from `/info`.
    async fn info(&self) -> AppResult<serde_json::Map<String, serde_json::Value>>;
}
