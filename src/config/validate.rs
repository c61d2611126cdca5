use url::Url;

use crate::error::{AppError, AppResult, ConfigError};

use super::types::{DriverConfig, JobDefinition};

impl DriverConfig {
    /// Jobs of a scenario in dependency order, checked before anything runs.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown or empty scenario, an undefined job,
    /// a job without endpoints or connections, or an endpoint that is not an
    /// absolute url.
    pub fn scenario_jobs(&self, scenario: &str) -> AppResult<Vec<(&str, &JobDefinition)>> {
        let names = self.scenarios.get(scenario).ok_or_else(|| {
            AppError::config(ConfigError::UnknownScenario {
                name: scenario.to_owned(),
            })
        })?;
        if names.is_empty() {
            return Err(AppError::config(ConfigError::EmptyScenario {
                name: scenario.to_owned(),
            }));
        }

        let mut jobs = Vec::with_capacity(names.len());
        for name in names {
            let definition = self.jobs.get(name).ok_or_else(|| {
                AppError::config(ConfigError::UnknownJob {
                    scenario: scenario.to_owned(),
                    job: name.clone(),
                })
            })?;
            validate_job(name, definition)?;
            jobs.push((name.as_str(), definition));
        }
        Ok(jobs)
    }
}

fn validate_job(name: &str, definition: &JobDefinition) -> AppResult<()> {
    if definition.endpoints.is_empty() {
        return Err(AppError::config(ConfigError::NoEndpoints {
            job: name.to_owned(),
        }));
    }
    if definition.job.connections == 0 {
        return Err(AppError::config(ConfigError::ZeroConnections {
            job: name.to_owned(),
        }));
    }
    for endpoint in &definition.endpoints {
        Url::parse(endpoint).map_err(|source| {
            AppError::config(ConfigError::InvalidEndpoint {
                job: name.to_owned(),
                endpoint: endpoint.clone(),
                source,
            })
        })?;
    }
    Ok(())
}
