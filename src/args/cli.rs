use std::collections::BTreeMap;
use std::time::Duration;

use clap::Parser;

use super::parsers::{parse_bool_env, parse_duration_arg, parse_positive_usize, parse_property};
use super::types::PositiveUsize;

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Benchmark job driver - submits jobs to remote agents, drives their lifecycle, and reports reduced statistics."
)]
pub struct DriverArgs {
    /// Configuration file with jobs and scenarios (defaults to benchdriver.toml or benchdriver.json)
    #[arg(long, short = 'c', env = "BENCHDRIVER_CONFIG")]
    pub config: Option<String>,

    /// Scenario to run
    #[arg(long, short = 's', env = "BENCHDRIVER_SCENARIO")]
    pub scenario: String,

    /// Number of times the scenario is run
    #[arg(
        long,
        short = 'i',
        default_value = "1",
        env = "BENCHDRIVER_ITERATIONS",
        value_parser = parse_positive_usize
    )]
    pub iterations: PositiveUsize,

    /// Iterations dropped from each end (by requests per second) before averaging
    #[arg(long, default_value_t = 0, env = "BENCHDRIVER_EXCLUDE")]
    pub exclude: usize,

    /// Keep the scenario running for this long once started (supports ms/s/m/h)
    #[arg(long, env = "BENCHDRIVER_SPAN", value_parser = parse_duration_arg)]
    pub span: Option<Duration>,

    /// Write the results document as JSON to this path
    #[arg(long, short = 'o', env = "BENCHDRIVER_OUTPUT")]
    pub output: Option<String>,

    /// Property stored with the results in 'key=value' format (repeatable)
    #[arg(long = "property", short = 'p', value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// Session identifier stored as the 'session' property (defaults to a UTC timestamp)
    #[arg(long, env = "BENCHDRIVER_SESSION")]
    pub session: Option<String>,

    /// Description stored with the statistics
    #[arg(long, default_value = "", env = "BENCHDRIVER_DESCRIPTION")]
    pub description: String,

    /// Leave measurement metadata out of the results document
    #[arg(long = "exclude-metadata")]
    pub exclude_metadata: bool,

    /// Leave raw measurements out of the results document
    #[arg(long = "exclude-measurements")]
    pub exclude_measurements: bool,

    /// Enable verbose logging (sets log level to debug unless overridden by BENCHDRIVER_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,
}

impl DriverArgs {
    /// `--property` pairs plus the session; a repeated key keeps the last value.
    #[must_use]
    pub fn property_map(&self, session: &str) -> BTreeMap<String, String> {
        let mut properties: BTreeMap<String, String> = self.properties.iter().cloned().collect();
        properties.insert("session".to_owned(), session.to_owned());
        properties
    }
}
