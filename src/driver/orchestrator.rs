use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::config::{DriverConfig, JobDefinition};
use crate::error::{AppError, AppResult, JobError, ValidationError};
use crate::job::{JobRecord, JobState, Measurement, MeasurementMetadata, OperatingSystem};
use crate::results::{
    IterationJob, JobResult, JobResults, MeasurementSummary, iteration_statistics,
    normalize_measurements, reduce_runs, render_measures, summarize,
};
use crate::stats::{Statistics, reduce_statistics};

use super::connection::{JobConnection, StartOutcome};
use super::timings::LifecycleTimings;
use super::transport::AgentTransport;

/// Opens a transport for an agent endpoint.
pub trait TransportFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the endpoint cannot be used.
    fn connect(&self, endpoint: &str) -> AppResult<Arc<dyn AgentTransport>>;
}

/// What to run and how to report it.
#[derive(Debug, Clone)]
pub struct ScenarioRun<'cfg> {
    pub config: &'cfg DriverConfig,
    pub scenario: &'cfg str,
    pub description: String,
    pub iterations: usize,
    /// Iterations dropped from each end before averaging statistics.
    pub exclude: usize,
    /// Keeps non-blocking jobs running this long once everything started.
    pub span: Option<Duration>,
    pub exclude_metadata: bool,
    pub exclude_measurements: bool,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Completed,
    /// Refused by the agent or filtered out by an OS constraint.
    Skipped,
    Failed(String),
}

/// Final status of one job connection in one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub iteration: usize,
    pub job: String,
    pub endpoint: String,
    pub status: JobStatus,
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub results: JobResults,
    pub outcomes: Vec<JobOutcome>,
}

impl ScenarioReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|outcome| matches!(outcome.status, JobStatus::Failed(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotStatus {
    Active,
    Completed,
    Skipped,
    Failed(String),
}

struct Slot {
    connection: JobConnection,
    status: SlotStatus,
}

impl Slot {
    fn fail(&mut self, err: &AppError) {
        error!("Job '{}' on {} failed: {}", self.connection.name(), self.connection.endpoint(), err);
        self.status = SlotStatus::Failed(err.to_string());
    }

    fn is_live(&self) -> bool {
        matches!(self.status, SlotStatus::Active | SlotStatus::Completed)
    }
}

struct JobGroup<'cfg> {
    name: &'cfg str,
    definition: &'cfg JobDefinition,
    slots: Vec<Slot>,
    finished: bool,
}

/// Per-iteration data kept for the final reduction.
struct IterationJobData {
    metadata: Vec<MeasurementMetadata>,
    summaries: Vec<MeasurementSummary>,
    measurements: Vec<Vec<Measurement>>,
    environment: Map<String, Value>,
}

struct IterationOutput {
    jobs: BTreeMap<String, IterationJobData>,
    statistics: Option<Statistics>,
    outcomes: Vec<JobOutcome>,
}

/// Runs a scenario `iterations` times and reduces the results.
///
/// Jobs start in dependency order; each job starts on all of its agents at
/// once. Blocking jobs (`waitForExit`) are awaited, stopped, and deleted
/// before the next dependency starts. The remaining jobs are stopped and
/// deleted in reverse dependency order once every job is running. A failing
/// job is reported without interrupting its siblings.
///
/// # Errors
///
/// Returns an error when the scenario is invalid, `exclude` trims every
/// iteration, or results cannot be combined across iterations. Iterations
/// skipped at run time leave fewer statistics rows; when `exclude` no longer
/// fits them the statistics are left out with a warning.
pub async fn run_scenario(
    run: &ScenarioRun<'_>,
    factory: &dyn TransportFactory,
    timings: LifecycleTimings,
) -> AppResult<ScenarioReport> {
    let trimmed = run.exclude.saturating_mul(2);
    if trimmed >= run.iterations {
        return Err(AppError::validation(ValidationError::ExcludeTooLarge {
            iterations: run.iterations,
            exclude: run.exclude,
            trimmed,
        }));
    }
    run.config.scenario_jobs(run.scenario)?;

    let mut iterations = Vec::with_capacity(run.iterations);
    for iteration in 1..=run.iterations {
        if run.iterations > 1 {
            info!("Iteration {} of {}", iteration, run.iterations);
        }
        iterations.push(run_iteration(run, factory, timings, iteration).await?);
    }

    let mut results = JobResults {
        properties: run.properties.clone(),
        ..JobResults::default()
    };
    let mut outcomes = Vec::new();
    let mut statistics = Vec::new();
    let mut per_job: BTreeMap<String, Vec<IterationJobData>> = BTreeMap::new();
    for output in iterations {
        outcomes.extend(output.outcomes);
        statistics.extend(output.statistics);
        for (name, data) in output.jobs {
            per_job.entry(name).or_default().push(data);
        }
    }

    for (name, runs) in per_job {
        results.jobs.insert(name, combine_iterations(run, runs)?);
    }
    if !statistics.is_empty() {
        match reduce_statistics(&statistics, run.exclude) {
            Ok(reduced) => results.statistics = Some(reduced),
            Err(err) => warn!("Statistics were not computed: {}", err),
        }
    }

    Ok(ScenarioReport { results, outcomes })
}

fn combine_iterations(run: &ScenarioRun<'_>, runs: Vec<IterationJobData>) -> AppResult<JobResult> {
    let metadata = runs
        .first()
        .map(|data| data.metadata.clone())
        .unwrap_or_default();
    let summaries: Vec<Vec<MeasurementSummary>> =
        runs.iter().map(|data| data.summaries.clone()).collect();
    let reduced = reduce_runs(&summaries, &metadata)?;

    let mut result = JobResult {
        results: reduced,
        ..JobResult::default()
    };
    for data in runs {
        if !run.exclude_measurements {
            result.measurements.extend(data.measurements);
        }
        result.environment = data.environment;
    }
    if !run.exclude_metadata {
        result.metadata = metadata;
    }
    Ok(result)
}

async fn run_iteration(
    run: &ScenarioRun<'_>,
    factory: &dyn TransportFactory,
    timings: LifecycleTimings,
    iteration: usize,
) -> AppResult<IterationOutput> {
    let mut groups: Vec<JobGroup<'_>> = Vec::new();

    for (name, definition) in run.config.scenario_jobs(run.scenario)? {
        let mut slots = Vec::with_capacity(definition.endpoints.len());
        for endpoint in &definition.endpoints {
            let transport = factory.connect(endpoint)?;
            slots.push(Slot {
                connection: JobConnection::new(name, definition.job.clone(), transport, timings),
                status: SlotStatus::Active,
            });
        }
        let mut group = JobGroup {
            name,
            definition,
            slots,
            finished: false,
        };

        if let Some(required) = definition.job.options.required_operating_system
            && !matches_os(&mut group, required).await
        {
            info!(
                "Scenario skipped as the agent doesn't match the OS constraint ({:?}) on job '{}'",
                required, name
            );
            for slot in &mut group.slots {
                slot.status = SlotStatus::Skipped;
            }
            groups.push(group);
            teardown(&mut groups, timings).await;
            return Ok(IterationOutput {
                jobs: BTreeMap::new(),
                statistics: None,
                outcomes: outcomes(iteration, &groups),
            });
        }

        start_group(&mut group).await;
        if definition.job.wait_for_exit {
            wait_for_exit(&mut group, timings).await;
            finish_group(&mut group).await;
        }
        groups.push(group);
    }

    if let Some(span) = run.span {
        info!("Running for {}s ...", span.as_secs());
        tokio::time::sleep(span).await;
        for group in &groups {
            flush_group(group).await;
        }
    }

    teardown(&mut groups, timings).await;
    collect_iteration(run, &mut groups, iteration).await
}

async fn matches_os(group: &mut JobGroup<'_>, required: OperatingSystem) -> bool {
    for slot in &mut group.slots {
        let info = slot.connection.info().await;
        let os = info.get("os").and_then(Value::as_str).unwrap_or_default();
        if !required.matches_name(os) {
            return false;
        }
    }
    true
}

async fn start_group(group: &mut JobGroup<'_>) {
    let started = join_all(group.slots.iter_mut().map(|slot| slot.connection.start())).await;
    for (slot, outcome) in group.slots.iter_mut().zip(started) {
        match outcome {
            Ok(StartOutcome::Running { url }) => {
                if let Some(url) = url {
                    info!("Job '{}' is listening on {}", group.name, url);
                }
                slot.connection.start_keep_alive();
            }
            Ok(StartOutcome::Completed) => slot.status = SlotStatus::Completed,
            Ok(StartOutcome::NotSupported) => slot.status = SlotStatus::Skipped,
            Err(err) => slot.fail(&err),
        }
    }
}

/// Polls blocking jobs until each reports `Stopped` or `Failed`.
async fn wait_for_exit(group: &mut JobGroup<'_>, timings: LifecycleTimings) {
    loop {
        let mut done = true;
        for slot in &mut group.slots {
            if slot.status != SlotStatus::Active {
                continue;
            }
            match slot.connection.state().await {
                Ok(JobState::Stopped) => slot.status = SlotStatus::Completed,
                Ok(JobState::Failed) => {
                    if let Err(err) = slot.connection.try_update().await {
                        warn!("Updating '{}' failed: {}", group.name, err);
                    }
                    let err = AppError::job(JobError::RemoteFailure {
                        job: group.name.to_owned(),
                        message: slot.connection.job().error.clone(),
                    });
                    slot.fail(&err);
                }
                Ok(
                    JobState::New
                    | JobState::Initializing
                    | JobState::Waiting
                    | JobState::Building
                    | JobState::Starting
                    | JobState::Running
                    | JobState::TraceCollecting
                    | JobState::TraceCollected
                    | JobState::Stopping
                    | JobState::Deleting
                    | JobState::Deleted,
                ) => done = false,
                Ok(JobState::NotSupported) => slot.status = SlotStatus::Skipped,
                Err(err) => slot.fail(&err),
            }
        }
        if done {
            return;
        }
        tokio::time::sleep(timings.poll_interval).await;
    }
}

async fn flush_group(group: &JobGroup<'_>) {
    let live = group.slots.iter().filter(|slot| slot.is_live());
    let flushed = join_all(live.map(|slot| slot.connection.flush_measurements())).await;
    for err in flushed.into_iter().filter_map(Result::err) {
        warn!("Flushing measurements of '{}' failed: {}", group.name, err);
    }
}

/// Stop, update, and delete every submitted connection of a group, each
/// step as a barrier across agents.
async fn finish_group(group: &mut JobGroup<'_>) {
    if group.finished {
        return;
    }
    group.finished = true;
    let name = group.name;

    let stopped = join_all(
        group
            .slots
            .iter()
            .filter(|slot| slot.connection.job_uri().is_some())
            .map(|slot| slot.connection.stop()),
    )
    .await;
    for err in stopped.into_iter().filter_map(Result::err) {
        warn!("Stopping '{}' failed: {}", name, err);
    }

    let updated = join_all(
        group
            .slots
            .iter_mut()
            .filter(|slot| slot.is_live())
            .map(|slot| slot.connection.try_update()),
    )
    .await;
    for err in updated.into_iter().filter_map(Result::err) {
        warn!("Updating '{}' failed: {}", name, err);
    }

    let deleted = join_all(
        group
            .slots
            .iter()
            .filter(|slot| slot.connection.job_uri().is_some())
            .map(|slot| slot.connection.delete()),
    )
    .await;
    for err in deleted.into_iter().filter_map(Result::err) {
        warn!("Deleting '{}' failed: {}", name, err);
    }
}

/// Finishes the remaining groups, clients first.
async fn teardown(groups: &mut [JobGroup<'_>], timings: LifecycleTimings) {
    for group in groups.iter_mut().rev() {
        if group.definition.job.wait_for_exit && !group.finished {
            wait_for_exit(group, timings).await;
        }
        finish_group(group).await;
    }
}

async fn collect_iteration(
    run: &ScenarioRun<'_>,
    groups: &mut [JobGroup<'_>],
    iteration: usize,
) -> AppResult<IterationOutput> {
    let mut jobs = BTreeMap::new();
    let mut records: Vec<(&str, Vec<JobRecord>)> = Vec::new();

    for group in groups.iter_mut() {
        let discard = group.definition.job.options.discard_results;
        let mut measurements = Vec::new();
        let mut metadata = Vec::new();
        let mut group_records = Vec::new();
        let mut environment = Map::new();

        for slot in group.slots.iter_mut().filter(|slot| slot.is_live()) {
            let mut record = slot.connection.job().clone();
            normalize_measurements(&mut record);
            if metadata.is_empty() {
                metadata.clone_from(&record.metadata);
            }
            if environment.is_empty() {
                environment = slot.connection.info().await;
            }
            measurements.push(record.measurements.clone());
            group_records.push(record);
        }
        if group_records.is_empty() || discard {
            continue;
        }

        let (summaries, table) = match reduce_group(&group_records, &metadata) {
            Ok(reduced) => reduced,
            Err(err) => {
                // Unreadable results fail this job only.
                for slot in group.slots.iter_mut().filter(|slot| slot.is_live()) {
                    slot.fail(&err);
                }
                continue;
            }
        };
        println!();
        println!("{}", group.name);
        println!("-------");
        println!("{table}");

        records.push((group.name, group_records));
        jobs.insert(
            group.name.to_owned(),
            IterationJobData {
                metadata,
                summaries,
                measurements,
                environment,
            },
        );
    }

    let sources: Vec<IterationJob<'_>> = records
        .iter()
        .map(|(name, group_records)| IterationJob {
            name,
            records: group_records,
            summaries: jobs
                .get(*name)
                .map(|data| data.summaries.as_slice())
                .unwrap_or_default(),
        })
        .collect();
    let statistics = (!sources.is_empty()).then(|| iteration_statistics(&run.description, &sources));

    Ok(IterationOutput {
        outcomes: outcomes(iteration, groups),
        jobs,
        statistics,
    })
}

/// Summarizes each agent's record, reduces them, and renders the table.
fn reduce_group(
    records: &[JobRecord],
    metadata: &[MeasurementMetadata],
) -> AppResult<(Vec<MeasurementSummary>, String)> {
    let runs = records
        .iter()
        .map(|record| summarize(&record.measurements, &record.metadata))
        .collect::<Result<Vec<_>, _>>()?;
    let summaries = reduce_runs(&runs, metadata)?;
    let table = render_measures(metadata, &summaries)?;
    Ok((summaries, table))
}

fn outcomes(iteration: usize, groups: &[JobGroup<'_>]) -> Vec<JobOutcome> {
    groups
        .iter()
        .flat_map(|group| {
            group.slots.iter().map(move |slot| JobOutcome {
                iteration,
                job: group.name.to_owned(),
                endpoint: slot.connection.endpoint().to_owned(),
                status: match &slot.status {
                    SlotStatus::Active | SlotStatus::Completed => JobStatus::Completed,
                    SlotStatus::Skipped => JobStatus::Skipped,
                    SlotStatus::Failed(message) => JobStatus::Failed(message.clone()),
                },
            })
        })
        .collect()
}
