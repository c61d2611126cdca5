use std::path::Path;

use tempfile::tempdir;

use super::*;
use crate::error::{AppError, AppResult, ConfigError};
use crate::job::{AttachmentKind, OperatingSystem};

fn write(dir: &Path, name: &str, content: &str) -> AppResult<std::path::PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}

#[test]
fn parse_toml_config_with_jobs_and_scenarios() -> AppResult<()> {
    let dir = tempdir()?;
    let path = write(
        dir.path(),
        "benchdriver.toml",
        r#"
[jobs.application]
endpoints = ["http://agent-a:5001"]
waitForExit = false
timeout = 120
connections = 64

[jobs.application.headers]
Accept = "text/plain"

[jobs.application.options]
displayOutput = true
requiredOperatingSystem = "Linux"

[[jobs.application.options.attachments]]
kind = "build"
localPath = "./build"
destination = "publish"

[jobs.load]
endpoints = ["http://agent-b:5001", "http://agent-c:5001"]
duration = 15

[scenarios]
plaintext = ["application", "load"]
"#,
    )?;

    let config = load_config_file(&path)?;
    let jobs = config.scenario_jobs("plaintext")?;
    let names: Vec<&str> = jobs.iter().map(|(name, _)| *name).collect();
    if names != ["application", "load"] {
        return Err(AppError::config(format!("Unexpected order: {:?}", names)));
    }

    let application = config
        .jobs
        .get("application")
        .ok_or_else(|| AppError::config("Missing application job"))?;
    if application.job.timeout != 120 || application.job.connections != 64 {
        return Err(AppError::config("Job template fields were not read"));
    }
    if application.job.headers.get("accept") != Some("text/plain") {
        return Err(AppError::config("Expected Accept header"));
    }
    let attachment = application
        .job
        .options
        .attachments
        .first()
        .ok_or_else(|| AppError::config("Missing attachment"))?;
    if attachment.kind != AttachmentKind::Build || attachment.destination.as_deref() != Some("publish")
    {
        return Err(AppError::config(format!("Unexpected attachment {:?}", attachment)));
    }
    if application.job.options.required_operating_system != Some(OperatingSystem::Linux)
        || !application.job.options.display_output
    {
        return Err(AppError::config("Options were not read"));
    }

    let load = config
        .jobs
        .get("load")
        .ok_or_else(|| AppError::config("Missing load job"))?;
    if load.endpoints.len() != 2 || load.job.duration != 15 || load.job.connections != 256 {
        return Err(AppError::config("Load job defaults were not applied"));
    }
    Ok(())
}

#[test]
fn parse_json_config() -> AppResult<()> {
    let dir = tempdir()?;
    let path = write(
        dir.path(),
        "benchdriver.json",
        r#"{
  "jobs": {
    "db": { "endpoints": ["https://agent:5001"], "waitForExit": true, "method": "POST" }
  },
  "scenarios": { "migrate": ["db"] }
}"#,
    )?;

    let config = load_config_file(&path)?;
    let jobs = config.scenario_jobs("migrate")?;
    let (_, db) = jobs
        .first()
        .ok_or_else(|| AppError::config("Missing db job"))?;
    if !db.job.wait_for_exit || db.job.method != "POST" {
        return Err(AppError::config("JSON job fields were not read"));
    }
    Ok(())
}

#[test]
fn unknown_extension_is_rejected() -> AppResult<()> {
    let dir = tempdir()?;
    let path = write(dir.path(), "benchdriver.yaml", "jobs: {}")?;
    match load_config_file(&path) {
        Err(AppError::Config(ConfigError::UnsupportedExtension { ext })) if ext == "yaml" => Ok(()),
        other => Err(AppError::config(format!(
            "Expected UnsupportedExtension, got {:?}",
            other
        ))),
    }
}

#[test]
fn scenario_validation_reports_first_problem() -> AppResult<()> {
    let dir = tempdir()?;
    let path = write(
        dir.path(),
        "benchdriver.toml",
        r#"
[jobs.empty]
endpoints = []

[jobs.idle]
endpoints = ["http://agent:5001"]
connections = 0

[jobs.broken]
endpoints = ["not a url"]

[scenarios]
missing = ["ghost"]
noendpoints = ["empty"]
noconnections = ["idle"]
badurl = ["broken"]
nothing = []
"#,
    )?;
    let config = load_config_file(&path)?;

    let checks: [(&str, fn(&ConfigError) -> bool); 6] = [
        ("missing", |err| matches!(err, ConfigError::UnknownJob { .. })),
        ("noendpoints", |err| matches!(err, ConfigError::NoEndpoints { .. })),
        ("noconnections", |err| matches!(err, ConfigError::ZeroConnections { .. })),
        ("badurl", |err| matches!(err, ConfigError::InvalidEndpoint { .. })),
        ("nothing", |err| matches!(err, ConfigError::EmptyScenario { .. })),
        ("undefined", |err| matches!(err, ConfigError::UnknownScenario { .. })),
    ];
    for (scenario, expected) in checks {
        match config.scenario_jobs(scenario) {
            Err(AppError::Config(err)) if expected(&err) => {}
            other => {
                return Err(AppError::config(format!(
                    "Scenario '{}' gave {:?}",
                    scenario,
                    other.map(|jobs| jobs.len())
                )));
            }
        }
    }
    Ok(())
}
