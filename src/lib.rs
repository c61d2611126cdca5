//! Core library for the `benchdriver` CLI.
//!
//! The driver submits benchmark jobs to remote agents over HTTP, follows
//! each job through its lifecycle, and reduces what the agents report:
//! latency percentiles across connections, measurement summaries across
//! runs, and trimmed statistics across iterations. The binary wires these
//! pieces to a configuration file and command-line arguments.
pub mod args;
pub mod config;
pub mod driver;
pub mod entry;
pub mod error;
pub mod job;
pub mod results;
pub mod stats;
pub mod system;
