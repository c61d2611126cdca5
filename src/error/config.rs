use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("No config file found (set --config or create benchdriver.toml).")]
    NotFound,
    #[error("Scenario '{name}' is not defined in the configuration.")]
    UnknownScenario { name: String },
    #[error("Scenario '{scenario}' references undefined job '{job}'.")]
    UnknownJob { scenario: String, job: String },
    #[error("Scenario '{name}' has no jobs.")]
    EmptyScenario { name: String },
    #[error("Job '{job}' has no agent endpoints.")]
    NoEndpoints { job: String },
    #[error("Job '{job}' must use at least one connection.")]
    ZeroConnections { job: String },
    #[error("Job '{job}' has an invalid endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        job: String,
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
