use super::*;
use crate::error::ValidationError;
use crate::job::{Measurement, MeasurementMetadata, Operation};

fn server_record() -> JobRecord {
    let mut running = agent_record(JobState::Running);
    running
        .metadata
        .push(MeasurementMetadata::new("benchmarks/cpu", Operation::Max).with_format("n0"));
    running.measurements.push(Measurement::new("benchmarks/cpu", 40));
    running.measurements.push(Measurement::new("benchmarks/cpu", 50));
    running
}

fn load_record() -> JobRecord {
    JobRecord {
        requests: 10_000,
        requests_per_second: 1000.0,
        actual_duration_ms: Some(10_000),
        ..agent_record(JobState::Running)
    }
}

#[tokio::test]
async fn failing_sibling_does_not_stop_the_scenario() -> AppResult<()> {
    let journal = new_journal();
    let failed = JobRecord {
        error: "Process crashed".to_owned(),
        ..agent_record(JobState::Failed)
    };
    let factory = FakeFactory::new([
        FakeAgent::new("http://server:5001", &journal)
            .with_records([agent_record(JobState::Initializing), server_record()]),
        FakeAgent::new("http://load-a:5001", &journal)
            .with_records([agent_record(JobState::Initializing), load_record()]),
        FakeAgent::new("http://load-b:5001", &journal)
            .with_records([agent_record(JobState::Initializing), failed])
            .with_states([JobState::Failed]),
    ]);
    let config = scenario_config([
        ("application", vec!["http://server:5001"], JobRecord::default()),
        (
            "load",
            vec!["http://load-a:5001", "http://load-b:5001"],
            JobRecord::default(),
        ),
    ]);

    let report = run_scenario(&scenario_run(&config), &factory, fast_timings()).await?;

    let statuses: Vec<(&str, &JobStatus)> = report
        .outcomes
        .iter()
        .map(|outcome| (outcome.endpoint.as_str(), &outcome.status))
        .collect();
    let expected_failure = matches!(
        statuses.as_slice(),
        [
            ("http://server:5001", JobStatus::Completed),
            ("http://load-a:5001", JobStatus::Completed),
            ("http://load-b:5001", JobStatus::Failed(message)),
        ] if message.contains("Process crashed")
    );
    if !expected_failure || !report.has_failures() {
        return Err(AppError::job(format!("Unexpected outcomes {:?}", statuses)));
    }

    // Clients are torn down before the application they load.
    let load_deleted = position_of(&journal, "http://load-a:5001", &Call::Delete);
    let server_deleted = position_of(&journal, "http://server:5001", &Call::Delete);
    match (load_deleted, server_deleted) {
        (Some(load), Some(server)) if load < server => {}
        other => return Err(AppError::job(format!("Unexpected teardown order {:?}", other))),
    }
    if position_of(&journal, "http://load-b:5001", &Call::Delete).is_none() {
        return Err(AppError::job("Failed job must still be deleted"));
    }

    let cpu = report
        .results
        .jobs
        .get("application")
        .and_then(|job| job.results.iter().find(|summary| summary.name == "benchmarks/cpu"))
        .and_then(|summary| summary.value.as_f64());
    if !cpu.is_some_and(|value| (value - 50.0).abs() <= f64::EPSILON) {
        return Err(AppError::job(format!("Unexpected cpu summary {:?}", cpu)));
    }

    let statistics = report
        .results
        .statistics
        .ok_or_else(|| AppError::job("Expected statistics"))?;
    if (statistics.rps - 1000.0).abs() > f64::EPSILON || (statistics.cpu - 50.0).abs() > f64::EPSILON
    {
        return Err(AppError::job(format!("Unexpected statistics {:?}", statistics)));
    }
    Ok(())
}

#[tokio::test]
async fn blocking_job_finishes_before_the_next_starts() -> AppResult<()> {
    let journal = new_journal();
    let factory = FakeFactory::new([
        FakeAgent::new("http://db:5001", &journal)
            .with_records([agent_record(JobState::Initializing), agent_record(JobState::Stopped)]),
        FakeAgent::new("http://server:5001", &journal)
            .with_records([agent_record(JobState::Initializing), server_record()]),
    ]);
    let migration = JobRecord {
        wait_for_exit: true,
        ..JobRecord::default()
    };
    let config = scenario_config([
        ("migration", vec!["http://db:5001"], migration),
        ("application", vec!["http://server:5001"], JobRecord::default()),
    ]);

    let report = run_scenario(&scenario_run(&config), &factory, fast_timings()).await?;
    if report.has_failures() {
        return Err(AppError::job(format!("Unexpected failures {:?}", report.outcomes)));
    }
    let db_deleted = position_of(&journal, "http://db:5001", &Call::Delete);
    let server_submitted = position_of(&journal, "http://server:5001", &Call::Submit);
    match (db_deleted, server_submitted) {
        (Some(deleted), Some(submitted)) if deleted < submitted => Ok(()),
        other => Err(AppError::job(format!("Unexpected ordering {:?}", other))),
    }
}

#[tokio::test]
async fn operating_system_constraint_skips_scenario() -> AppResult<()> {
    let journal = new_journal();
    let factory = FakeFactory::new([FakeAgent::new("http://server:5001", &journal)]);
    let mut job = JobRecord::default();
    job.options.required_operating_system = Some(OperatingSystem::Windows);
    let config = scenario_config([("application", vec!["http://server:5001"], job)]);

    let report = run_scenario(&scenario_run(&config), &factory, fast_timings()).await?;
    let skipped = report
        .outcomes
        .iter()
        .all(|outcome| outcome.status == JobStatus::Skipped);
    if !skipped || report.outcomes.is_empty() || !report.results.jobs.is_empty() {
        return Err(AppError::job(format!("Expected a skipped run, got {:?}", report.outcomes)));
    }
    if calls_of(&journal, "http://server:5001") != [Call::Info] {
        return Err(AppError::job("Skipped job must not be submitted"));
    }
    Ok(())
}

#[tokio::test]
async fn iterations_reduce_results_and_keep_measurements() -> AppResult<()> {
    let journal = new_journal();
    let factory = FakeFactory::new([FakeAgent::new("http://server:5001", &journal)
        .with_records([agent_record(JobState::Initializing), server_record()])]);
    let config = scenario_config([("application", vec!["http://server:5001"], JobRecord::default())]);
    let mut run = scenario_run(&config);
    run.iterations = 3;
    run.exclude = 1;
    run.exclude_metadata = true;
    run.properties.insert("branch".to_owned(), "main".to_owned());

    let report = run_scenario(&run, &factory, fast_timings()).await?;
    let application = report
        .results
        .jobs
        .get("application")
        .ok_or_else(|| AppError::job("Missing application results"))?;
    if application.measurements.len() != 3 || !application.metadata.is_empty() {
        return Err(AppError::job(format!(
            "Expected 3 measurement runs and no metadata, got {} and {}",
            application.measurements.len(),
            application.metadata.len()
        )));
    }
    if application.environment.get("os").and_then(Value::as_str) != Some("linux") {
        return Err(AppError::job("Expected agent environment"));
    }
    if report.results.properties.get("branch").map(String::as_str) != Some("main") {
        return Err(AppError::job("Expected properties"));
    }
    if report.outcomes.len() != 3 {
        return Err(AppError::job(format!("Expected 3 outcomes, got {}", report.outcomes.len())));
    }
    Ok(())
}

#[tokio::test]
async fn exclude_must_leave_an_iteration() -> AppResult<()> {
    let config = scenario_config([("application", vec!["http://server:5001"], JobRecord::default())]);
    let factory = FakeFactory::new(Vec::<FakeAgent>::new());
    let mut run = scenario_run(&config);
    run.iterations = 2;
    run.exclude = 1;

    match run_scenario(&run, &factory, fast_timings()).await {
        Err(AppError::Validation(ValidationError::ExcludeTooLarge { trimmed: 2, .. })) => Ok(()),
        other => Err(AppError::job(format!(
            "Expected ExcludeTooLarge, got {:?}",
            other.map(|report| report.outcomes)
        ))),
    }
}

#[tokio::test]
async fn span_flushes_measurements_before_teardown() -> AppResult<()> {
    let journal = new_journal();
    let factory = FakeFactory::new([FakeAgent::new("http://server:5001", &journal)
        .with_records([agent_record(JobState::Initializing), server_record()])]);
    let config = scenario_config([("application", vec!["http://server:5001"], JobRecord::default())]);
    let mut run = scenario_run(&config);
    run.span = Some(Duration::from_millis(20));

    run_scenario(&run, &factory, fast_timings()).await?;
    let flushed = position_of(&journal, "http://server:5001", &Call::Flush);
    let stopped = position_of(&journal, "http://server:5001", &Call::Stop);
    match (flushed, stopped) {
        (Some(flush), Some(stop)) if flush < stop => Ok(()),
        other => Err(AppError::job(format!("Unexpected ordering {:?}", other))),
    }
}

#[tokio::test]
async fn unreadable_measurement_fails_only_its_job() -> AppResult<()> {
    let journal = new_journal();
    let mut unreadable = load_record();
    unreadable
        .metadata
        .push(MeasurementMetadata::new("app/version", Operation::Avg).with_format("n0"));
    unreadable.measurements.push(Measurement::new("app/version", "n/a"));
    let factory = FakeFactory::new([
        FakeAgent::new("http://server:5001", &journal)
            .with_records([agent_record(JobState::Initializing), server_record()]),
        FakeAgent::new("http://load:5001", &journal)
            .with_records([agent_record(JobState::Initializing), unreadable]),
    ]);
    let config = scenario_config([
        ("application", vec!["http://server:5001"], JobRecord::default()),
        ("load", vec!["http://load:5001"], JobRecord::default()),
    ]);

    let report = run_scenario(&scenario_run(&config), &factory, fast_timings()).await?;

    if !report.results.jobs.contains_key("application") || report.results.jobs.contains_key("load")
    {
        return Err(AppError::job(format!(
            "Expected only application results, got {:?}",
            report.results.jobs.keys().collect::<Vec<_>>()
        )));
    }
    let load_failed = report.outcomes.iter().any(|outcome| {
        outcome.job == "load"
            && matches!(&outcome.status, JobStatus::Failed(message) if message.contains("app/version"))
    });
    let application_completed = report
        .outcomes
        .iter()
        .any(|outcome| outcome.job == "application" && outcome.status == JobStatus::Completed);
    if !load_failed || !application_completed {
        return Err(AppError::job(format!("Unexpected outcomes {:?}", report.outcomes)));
    }
    Ok(())
}

#[tokio::test]
async fn failed_blocking_job_reports_agent_error() -> AppResult<()> {
    let journal = new_journal();
    let crashed = JobRecord {
        error: "dotnet crashed: OOM".to_owned(),
        ..agent_record(JobState::Running)
    };
    let factory = FakeFactory::new([FakeAgent::new("http://db:5001", &journal)
        .with_records([agent_record(JobState::Initializing), crashed])
        .with_states([JobState::Failed])]);
    let migration = JobRecord {
        wait_for_exit: true,
        ..JobRecord::default()
    };
    let config = scenario_config([("migration", vec!["http://db:5001"], migration)]);

    let report = run_scenario(&scenario_run(&config), &factory, fast_timings()).await?;
    match report.outcomes.as_slice() {
        [outcome] if matches!(
            &outcome.status,
            JobStatus::Failed(message) if message.contains("dotnet crashed: OOM")
        ) => {}
        other => return Err(AppError::job(format!("Unexpected outcomes {:?}", other))),
    }
    if position_of(&journal, "http://db:5001", &Call::Delete).is_none() {
        return Err(AppError::job("Failed job must still be deleted"));
    }
    Ok(())
}

#[tokio::test]
async fn skipped_iteration_leaves_too_few_rows_for_exclusion() -> AppResult<()> {
    let journal = new_journal();
    let factory = FakeFactory::new([FakeAgent::new("http://server:5001", &journal)
        .with_records([agent_record(JobState::Initializing), server_record()])
        .with_os(["linux", "windows", "linux"])]);
    let mut job = JobRecord::default();
    job.options.required_operating_system = Some(OperatingSystem::Linux);
    let config = scenario_config([("application", vec!["http://server:5001"], job)]);
    let mut run = scenario_run(&config);
    run.iterations = 3;
    run.exclude = 1;

    let report = run_scenario(&run, &factory, fast_timings()).await?;
    if let Some(statistics) = report.results.statistics {
        return Err(AppError::job(format!(
            "Two rows cannot be trimmed by one on each end, got {:?}",
            statistics
        )));
    }
    let runs = report
        .results
        .jobs
        .get("application")
        .map(|job| job.measurements.len());
    if runs != Some(2) {
        return Err(AppError::job(format!("Expected 2 measured iterations, got {:?}", runs)));
    }
    let skipped = report
        .outcomes
        .iter()
        .filter(|outcome| outcome.status == JobStatus::Skipped)
        .count();
    if skipped != 1 {
        return Err(AppError::job(format!("Expected one skipped iteration, got {}", skipped)));
    }
    Ok(())
}
