use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::job::JobState;

use super::retry::with_retry;
use super::timings::LifecycleTimings;
use super::transport::{AgentTransport, LogKind};

/// How a stop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    Failed,
    /// The agent did not report a final state within the grace period.
    GraceExpired,
}

/// State shared between a submitted job and its background tasks.
pub(super) struct Session {
    pub(super) name: String,
    pub(super) job_uri: String,
    pub(super) transport: Arc<dyn AgentTransport>,
    pub(super) timings: LifecycleTimings,
    keep_alive: AtomicBool,
    running_since: Mutex<Option<Instant>>,
    timeout: Option<Duration>,
}

impl Session {
    pub(super) fn new(
        name: String,
        job_uri: String,
        transport: Arc<dyn AgentTransport>,
        timings: LifecycleTimings,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            name,
            job_uri,
            transport,
            timings,
            keep_alive: AtomicBool::new(false),
            running_since: Mutex::new(None),
            timeout,
        }
    }

    /// Sets the keep-alive flag; returns whether it was already set.
    pub(super) fn enable_keep_alive(&self) -> bool {
        self.keep_alive.swap(true, Ordering::AcqRel)
    }

    pub(super) fn disable_keep_alive(&self) {
        self.keep_alive.store(false, Ordering::Release);
    }

    pub(super) fn keep_alive_enabled(&self) -> bool {
        self.keep_alive.load(Ordering::Acquire)
    }

    pub(super) fn mark_running(&self) {
        let mut since = self
            .running_since
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if since.is_none() {
            *since = Some(Instant::now());
        }
    }

    fn timed_out(&self) -> bool {
        let Some(timeout) = self.timeout else {
            return false;
        };
        self.running_since
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|since| since.elapsed() > timeout)
    }

    pub(super) async fn state(&self) -> AppResult<JobState> {
        with_retry(self.timings.retry, "Job state poll", || {
            self.transport.state(&self.job_uri)
        })
        .await
    }
}

/// Asks the agent to stop the job and waits for it to report a final state,
/// giving up after the grace period.
pub(super) async fn stop_session(session: &Session) -> AppResult<StopOutcome> {
    session.disable_keep_alive();
    info!("Stopping job '{}' ...", session.name);

    with_retry(session.timings.retry, "Job stop", || {
        session.transport.stop(&session.job_uri)
    })
    .await?;

    let requested = Instant::now();
    loop {
        tokio::time::sleep(session.timings.poll_interval).await;

        match session.state().await {
            Ok(JobState::Stopped) => {
                info!("Job '{}' stopped", session.name);
                return Ok(StopOutcome::Stopped);
            }
            Ok(JobState::Failed) => {
                warn!("Job '{}' failed while stopping", session.name);
                return Ok(StopOutcome::Failed);
            }
            Ok(state) => debug!("Job '{}' is {}", session.name, state),
            Err(err) => warn!("Could not read the state of job '{}': {}", session.name, err),
        }

        if requested.elapsed() > session.timings.stop_grace {
            warn!(
                "Agent didn't stop job '{}' within {}s, deleting it anyway",
                session.name,
                session.timings.stop_grace.as_secs()
            );
            return Ok(StopOutcome::GraceExpired);
        }
    }
}

/// Touches the job while the keep-alive flag is set and stops it once the
/// client-side timeout elapses.
pub(super) async fn keep_alive_loop(session: Arc<Session>) {
    while session.keep_alive_enabled() {
        if let Err(err) = session.transport.touch(&session.job_uri).await {
            warn!("Could not ping the agent for '{}': {}", session.name, err);
        }

        if session.timed_out() {
            warn!("Job '{}' has timed out, stopping it", session.name);
            if let Err(err) = stop_session(&session).await {
                warn!("Stopping timed out job '{}' failed: {}", session.name, err);
            }
            break;
        }

        tokio::time::sleep(session.timings.keep_alive_interval).await;
    }
    debug!("Keep-alive for '{}' ended", session.name);
}

/// Follows a remote log and forwards new lines while the job is alive.
pub(super) async fn stream_log(session: Arc<Session>, kind: LogKind) {
    let mut cursor = 0_usize;
    while session.keep_alive_enabled() {
        match session
            .transport
            .log_lines(&session.job_uri, kind, cursor)
            .await
        {
            Ok(lines) => {
                cursor = cursor.saturating_add(lines.len());
                for line in lines {
                    info!("[{}] {}", session.name, line);
                }
            }
            Err(err) => debug!("Reading {} log of '{}' failed: {}", kind.endpoint(), session.name, err),
        }
        tokio::time::sleep(session.timings.log_interval).await;
    }
}
