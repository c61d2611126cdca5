use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{AgentField, AppError, AppResult, JobError};
use crate::job::{Attachment, JobRecord, JobState};

use super::attachments::resolve_attachments;
use super::retry::with_retry;
use super::session::{Session, StopOutcome, keep_alive_loop, stop_session, stream_log};
use super::timings::{DRIVER_VERSION, LifecycleTimings, MIN_AGENT_VERSION};
use super::transport::{AgentTransport, DeleteOutcome, LogKind};

/// How [`JobConnection::start`] ended when the agent did not fail the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The job is running; `url` is where its application listens.
    Running { url: Option<String> },
    /// A wait-for-exit job already ran to completion.
    Completed,
    /// The agent refused the configuration; the job is skipped.
    NotSupported,
}

enum Selection {
    Started,
    NotSupported,
}

/// Drives one job on one agent: submit, selection, uploads, start, the
/// running wait, stop, and delete. Each connection owns its keep-alive and
/// log streaming tasks.
pub struct JobConnection {
    name: String,
    job: JobRecord,
    attachments: Vec<Attachment>,
    wait_for_exit: bool,
    display_output: bool,
    display_build: bool,
    timeout: Option<Duration>,
    transport: Arc<dyn AgentTransport>,
    timings: LifecycleTimings,
    session: Option<Arc<Session>>,
    background: Vec<JoinHandle<()>>,
    environment: Option<Map<String, Value>>,
}

impl JobConnection {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        mut job: JobRecord,
        transport: Arc<dyn AgentTransport>,
        timings: LifecycleTimings,
    ) -> Self {
        job.driver_version = DRIVER_VERSION;
        Self {
            name: name.into(),
            attachments: job.options.attachments.clone(),
            wait_for_exit: job.wait_for_exit,
            display_output: job.options.display_output,
            display_build: job.options.display_build,
            timeout: (job.timeout > 0).then(|| Duration::from_secs(job.timeout)),
            job,
            transport,
            timings,
            session: None,
            background: Vec::new(),
            environment: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last job record observed from the agent.
    #[must_use]
    pub const fn job(&self) -> &JobRecord {
        &self.job
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    #[must_use]
    pub fn job_uri(&self) -> Option<&str> {
        self.session.as_deref().map(|session| session.job_uri.as_str())
    }

    fn session(&self) -> AppResult<Arc<Session>> {
        self.session.clone().ok_or_else(|| {
            AppError::job(JobError::NotSubmitted {
                job: self.name.clone(),
            })
        })
    }

    /// Submits the job and drives it until it runs, completes, or is
    /// refused.
    ///
    /// # Errors
    ///
    /// Returns an error when the agent is incompatible, the job fails
    /// remotely, stops unexpectedly, or the network keeps failing.
    pub async fn start(&mut self) -> AppResult<StartOutcome> {
        self.submit().await?;
        match self.wait_for_selection().await? {
            Selection::Started => self.wait_for_running().await,
            Selection::NotSupported => Ok(StartOutcome::NotSupported),
        }
    }

    async fn submit(&mut self) -> AppResult<()> {
        info!("Starting job '{}' on {} ...", self.name, self.endpoint());
        let transport = Arc::clone(&self.transport);
        let job = &self.job;
        let job_uri = with_retry(self.timings.retry, "Job submission", || {
            transport.submit(job)
        })
        .await?;
        info!("Fetching job: {}", job_uri);

        self.session = Some(Arc::new(Session::new(
            self.name.clone(),
            job_uri,
            transport,
            self.timings,
            self.timeout,
        )));
        Ok(())
    }

    async fn fetch_required(&self, session: &Session) -> AppResult<JobRecord> {
        with_retry(self.timings.retry, "Job poll", || {
            session.transport.fetch(&session.job_uri)
        })
        .await?
        .ok_or_else(|| {
            AppError::job(JobError::JobNotFound {
                uri: session.job_uri.clone(),
            })
        })
    }

    /// Replaces the local record, rejecting backward state moves.
    fn observe(&mut self, record: JobRecord) -> AppResult<JobState> {
        let previous = self.job.state;
        if !previous.can_advance_to(record.state) {
            return Err(AppError::job(JobError::StateRegression {
                from: previous,
                to: record.state,
            }));
        }
        self.job = record;
        Ok(previous)
    }

    async fn wait_for_selection(&mut self) -> AppResult<Selection> {
        let session = self.session()?;
        loop {
            let record = self.fetch_required(&session).await?;
            validate_agent(&record)?;
            let state = record.state;
            self.observe(record)?;

            match state {
                JobState::Initializing => {
                    info!("Job '{}' has been selected by the agent", self.name);
                    self.start_keep_alive();
                    self.upload_attachments(&session).await?;
                    with_retry(self.timings.retry, "Job start", || {
                        session.transport.start(&session.job_uri)
                    })
                    .await?;
                    info!("Job '{}' is now building ...", self.name);
                    return Ok(Selection::Started);
                }
                JobState::New => {
                    tokio::time::sleep(self.timings.poll_interval).await;
                }
                JobState::Failed => return Err(self.remote_failure()),
                JobState::NotSupported => {
                    info!("Agent does not support the configuration of '{}'", self.name);
                    return Ok(Selection::NotSupported);
                }
                JobState::Waiting
                | JobState::Building
                | JobState::Starting
                | JobState::Running
                | JobState::TraceCollecting
                | JobState::TraceCollected
                | JobState::Stopping
                | JobState::Stopped
                | JobState::Deleting
                | JobState::Deleted => {
                    warn!(
                        "Job '{}' left selection as {} without a start request",
                        self.name, state
                    );
                    return Ok(Selection::Started);
                }
            }
        }
    }

    async fn upload_attachments(&self, session: &Session) -> AppResult<()> {
        let files = resolve_attachments(&self.attachments)?;
        let job_id = self.job.id;
        for file in &files {
            info!(
                "Uploading '{}' to {} as '{}'",
                file.local_path.display(),
                file.kind.endpoint(),
                file.destination
            );
            with_retry(self.timings.retry, "Attachment upload", || {
                session.transport.upload(&session.job_uri, job_id, file)
            })
            .await?;
        }
        Ok(())
    }

    async fn wait_for_running(&mut self) -> AppResult<StartOutcome> {
        let session = self.session()?;
        loop {
            let record = self.fetch_required(&session).await?;
            let state = record.state;
            let previous = self.observe(record)?;

            match state {
                JobState::Running => {
                    if previous != JobState::Running {
                        info!("Job '{}' is running", self.name);
                        session.mark_running();
                    }
                    return Ok(StartOutcome::Running {
                        url: self.job.url.clone(),
                    });
                }
                JobState::Failed => {
                    error!("Job '{}' failed on the agent, stopping ...", self.name);
                    if !self.job.error.is_empty() {
                        error!("{}", self.job.error);
                    }
                    return Err(self.remote_failure());
                }
                JobState::NotSupported => {
                    info!("Agent does not support the configuration of '{}'", self.name);
                    return Ok(StartOutcome::NotSupported);
                }
                JobState::Stopped => {
                    info!("Job '{}' finished", self.name);
                    if self.wait_for_exit {
                        return Ok(StartOutcome::Completed);
                    }
                    return Err(AppError::job(JobError::UnexpectedStop {
                        job: self.name.clone(),
                    }));
                }
                JobState::New
                | JobState::Initializing
                | JobState::Waiting
                | JobState::Building
                | JobState::Starting
                | JobState::TraceCollecting
                | JobState::TraceCollected
                | JobState::Stopping
                | JobState::Deleting
                | JobState::Deleted => {
                    debug!("Job '{}' is {}", self.name, state);
                    tokio::time::sleep(self.timings.poll_interval).await;
                }
            }
        }
    }

    fn remote_failure(&self) -> AppError {
        AppError::job(JobError::RemoteFailure {
            job: self.name.clone(),
            message: self.job.error.clone(),
        })
    }

    /// Starts the keep-alive task, plus log streaming when the job asks for
    /// it. Calling it again while the tasks run has no effect.
    pub fn start_keep_alive(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        if session.enable_keep_alive() {
            return;
        }
        self.background
            .push(tokio::spawn(keep_alive_loop(Arc::clone(&session))));
        if self.display_output {
            self.background
                .push(tokio::spawn(stream_log(Arc::clone(&session), LogKind::Output)));
        }
        if self.display_build {
            self.background
                .push(tokio::spawn(stream_log(session, LogKind::Build)));
        }
    }

    /// Clears the keep-alive flag; background tasks exit on their next turn.
    pub fn stop_keep_alive(&self) {
        if let Some(session) = &self.session {
            session.disable_keep_alive();
        }
    }

    /// # Errors
    ///
    /// Returns an error when the job was never submitted or the state poll
    /// keeps failing.
    pub async fn state(&self) -> AppResult<JobState> {
        self.session()?.state().await
    }

    /// Stops the job and waits for a final state within the grace period.
    ///
    /// # Errors
    ///
    /// Returns an error when the job was never submitted or the stop request
    /// itself fails.
    pub async fn stop(&self) -> AppResult<StopOutcome> {
        let session = self.session()?;
        stop_session(&session).await
    }

    /// Downloads the full record, including measurements. Returns `false`
    /// and keeps the previous record when the agent has nothing usable.
    ///
    /// # Errors
    ///
    /// Returns an error when the job was never submitted or the agent stays
    /// unreachable.
    pub async fn try_update(&mut self) -> AppResult<bool> {
        let session = self.session()?;
        let fetched = with_retry(self.timings.retry, "Job update", || {
            session.transport.fetch(&session.job_uri)
        })
        .await;

        match fetched {
            Ok(Some(record)) => {
                self.job = record;
                Ok(true)
            }
            Ok(None) => {
                warn!("Job '{}' could not be found when updating it", self.name);
                Ok(false)
            }
            Err(AppError::Job(JobError::Decode { source, .. })) => {
                warn!("Job '{}' returned an unreadable record: {}", self.name, source);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Deletes the remote job. An agent that no longer knows it is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error when the job was never submitted or the request
    /// keeps failing.
    pub async fn delete(&self) -> AppResult<DeleteOutcome> {
        let session = self.session()?;
        self.stop_keep_alive();
        info!("Deleting job '{}' ...", self.name);
        let outcome = with_retry(self.timings.retry, "Job delete", || {
            session.transport.delete(&session.job_uri)
        })
        .await?;
        match outcome {
            DeleteOutcome::Deleted => info!("Job '{}' deleted", self.name),
            DeleteOutcome::AlreadyGone => info!(
                "Job '{}' was already removed from the agent (it may have aborted itself)",
                self.name
            ),
        }
        Ok(outcome)
    }

    /// Discards measurements gathered so far.
    ///
    /// # Errors
    ///
    /// Returns an error when the job was never submitted or the request fails.
    pub async fn clear_measurements(&self) -> AppResult<()> {
        let session = self.session()?;
        with_retry(self.timings.retry, "Measurement reset", || {
            session.transport.reset_stats(&session.job_uri)
        })
        .await
    }

    /// Asks the agent to publish buffered measurements.
    ///
    /// # Errors
    ///
    /// Returns an error when the job was never submitted or the request fails.
    pub async fn flush_measurements(&self) -> AppResult<()> {
        let session = self.session()?;
        with_retry(self.timings.retry, "Measurement flush", || {
            session.transport.flush_measurements(&session.job_uri)
        })
        .await
    }

    /// Agent environment; cached after the first successful call. A failed
    /// call is logged and yields an empty map.
    pub async fn info(&mut self) -> Map<String, Value> {
        if let Some(environment) = &self.environment {
            return environment.clone();
        }
        let transport = Arc::clone(&self.transport);
        match with_retry(self.timings.retry, "Agent info", || transport.info()).await {
            Ok(environment) => {
                self.environment = Some(environment.clone());
                environment
            }
            Err(err) => {
                warn!("Could not read agent info from {}: {}", self.endpoint(), err);
                Map::new()
            }
        }
    }
}

impl Drop for JobConnection {
    fn drop(&mut self) {
        self.stop_keep_alive();
    }
}

fn validate_agent(record: &JobRecord) -> Result<(), JobError> {
    if record.server_version < MIN_AGENT_VERSION {
        return Err(JobError::UnsupportedAgentVersion {
            actual: record.server_version,
            required: MIN_AGENT_VERSION,
        });
    }
    let missing = |value: Option<&str>| value.is_none_or(|value| value.trim().is_empty());
    if missing(record.hardware.as_deref()) {
        return Err(JobError::MissingAgentField {
            field: AgentField::Hardware,
        });
    }
    if missing(record.hardware_version.as_deref()) {
        return Err(JobError::MissingAgentField {
            field: AgentField::HardwareVersion,
        });
    }
    if record.operating_system.is_none() {
        return Err(JobError::MissingAgentField {
            field: AgentField::OperatingSystem,
        });
    }
    Ok(())
}
