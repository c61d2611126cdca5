use std::time::Duration;

/// Oldest agent protocol the driver can talk to.
pub const MIN_AGENT_VERSION: u32 = 4;
/// Protocol version announced in submitted jobs.
pub const DRIVER_VERSION: u32 = 2;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(2);
const LOG_INTERVAL: Duration = Duration::from_millis(500);
const STOP_GRACE: Duration = Duration::from_secs(30);
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Wait periods used while driving a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleTimings {
    /// Between polls while waiting for selection, running, or stopped.
    pub poll_interval: Duration,
    pub keep_alive_interval: Duration,
    pub log_interval: Duration,
    /// How long a stopping job may take before it is deleted anyway.
    pub stop_grace: Duration,
    pub retry: RetryPolicy,
}

impl Default for LifecycleTimings {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            keep_alive_interval: KEEP_ALIVE_INTERVAL,
            log_interval: LOG_INTERVAL,
            stop_grace: STOP_GRACE,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded retry with a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: RETRY_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}
