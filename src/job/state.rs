use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a job, owned by the agent and mirrored by polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobState {
    /// Submitted, not yet picked up by the agent.
    #[default]
    New,
    /// Selected by the agent; attachments may be uploaded before start.
    Initializing,
    /// Ready to start after the driver posted `start`.
    Waiting,
    Building,
    /// Application launched, agent is waiting for it to respond.
    Starting,
    Running,
    TraceCollecting,
    TraceCollected,
    Stopping,
    Stopped,
    Deleting,
    Deleted,
    Failed,
    /// The agent cannot run this job configuration.
    NotSupported,
}

const ALL_STATES: [JobState; 14] = [
    JobState::New,
    JobState::Initializing,
    JobState::Waiting,
    JobState::Building,
    JobState::Starting,
    JobState::Running,
    JobState::TraceCollecting,
    JobState::TraceCollected,
    JobState::Stopping,
    JobState::Stopped,
    JobState::Deleting,
    JobState::Deleted,
    JobState::Failed,
    JobState::NotSupported,
];

impl JobState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            JobState::New => "New",
            JobState::Initializing => "Initializing",
            JobState::Waiting => "Waiting",
            JobState::Building => "Building",
            JobState::Starting => "Starting",
            JobState::Running => "Running",
            JobState::TraceCollecting => "TraceCollecting",
            JobState::TraceCollected => "TraceCollected",
            JobState::Stopping => "Stopping",
            JobState::Stopped => "Stopped",
            JobState::Deleting => "Deleting",
            JobState::Deleted => "Deleted",
            JobState::Failed => "Failed",
            JobState::NotSupported => "NotSupported",
        }
    }

    /// Position along the forward lifecycle. Trace collection happens while
    /// the application is running, so it shares the `Running` rank.
    const fn rank(self) -> u8 {
        match self {
            JobState::New => 0,
            JobState::Initializing => 1,
            JobState::Waiting => 2,
            JobState::Building => 3,
            JobState::Starting => 4,
            JobState::Running | JobState::TraceCollecting | JobState::TraceCollected => 5,
            JobState::Stopping => 6,
            JobState::Stopped => 7,
            JobState::Deleting => 8,
            JobState::Deleted => 9,
            JobState::Failed | JobState::NotSupported => 10,
        }
    }

    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, JobState::Failed | JobState::NotSupported)
    }

    /// Whether observing `next` after `self` keeps the lifecycle monotonic.
    /// Any state may fall into a failure state; a failed job may only be
    /// cleaned up afterwards.
    #[must_use]
    pub const fn can_advance_to(self, next: JobState) -> bool {
        if next.is_failure() {
            return true;
        }
        if self.is_failure() {
            return matches!(next, JobState::Deleting | JobState::Deleted);
        }
        next.rank() >= self.rank()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().trim_matches('"');
        ALL_STATES
            .iter()
            .copied()
            .find(|state| state.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("Unknown job state '{}'.", value))
    }
}
