mod app;
mod config;
mod job;
mod results;
mod stats;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use job::{AgentField, JobError};
pub use results::ResultsError;
pub use stats::StatsError;
pub use validation::ValidationError;
