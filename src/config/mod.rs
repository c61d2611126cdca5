//! Driver configuration: job templates, agent endpoints, and scenarios.
mod loader;
pub mod types;
mod validate;

#[cfg(test)]
mod tests;

pub use loader::{load_config, load_config_file};
pub use types::{DriverConfig, JobDefinition};
