use std::path::Path;

use chrono::Utc;
use clap::Parser;
use tracing::{error, info};

use crate::args::DriverArgs;
use crate::config::load_config;
use crate::driver::{
    HttpTransportFactory, JobStatus, LifecycleTimings, ScenarioReport, ScenarioRun,
    build_agent_client, run_scenario,
};
use crate::error::{AppError, AppResult, ValidationError};
use crate::system::init_logging;

/// Binary entry point: parse arguments, set up logging and the runtime, then
/// run the scenario.
///
/// # Errors
///
/// Returns an error when configuration is invalid, the runtime cannot be
/// built, the results cannot be written, or any job failed.
pub fn run() -> AppResult<()> {
    let args = DriverArgs::parse();
    init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_async(args))
}

async fn run_async(args: DriverArgs) -> AppResult<()> {
    let config = load_config(args.config.as_deref())?;
    let session = args
        .session
        .clone()
        .unwrap_or_else(|| Utc::now().format("%Y%m%d%H%M%S").to_string());
    info!("Session: {}", session);

    let run = ScenarioRun {
        config: &config,
        scenario: &args.scenario,
        description: args.description.clone(),
        iterations: args.iterations.get(),
        exclude: args.exclude,
        span: args.span,
        exclude_metadata: args.exclude_metadata,
        exclude_measurements: args.exclude_measurements,
        properties: args.property_map(&session),
    };
    let factory = HttpTransportFactory::new(build_agent_client()?);
    let report = run_scenario(&run, &factory, LifecycleTimings::default()).await?;

    if let Some(output) = args.output.as_deref() {
        report.results.write_to(Path::new(output)).await?;
    }
    report_outcomes(&report)
}

fn report_outcomes(report: &ScenarioReport) -> AppResult<()> {
    for outcome in &report.outcomes {
        match &outcome.status {
            JobStatus::Completed => {}
            JobStatus::Skipped => info!(
                "Job '{}' on {} was skipped (iteration {})",
                outcome.job, outcome.endpoint, outcome.iteration
            ),
            JobStatus::Failed(message) => error!(
                "Job '{}' on {} failed (iteration {}): {}",
                outcome.job, outcome.endpoint, outcome.iteration, message
            ),
        }
    }
    if report.has_failures() {
        return Err(AppError::validation(ValidationError::JobsFailed));
    }
    Ok(())
}
