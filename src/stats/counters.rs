use std::time::Duration;

use crate::error::StatsError;
use crate::job::JobRecord;

use super::latency::{LatencyAggregator, LatencyMode};

/// Request counters for one load connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionCounters {
    pub requests: u64,
    pub bad_responses: u64,
    pub socket_errors: u64,
}

/// Collects request outcomes from a fixed set of load connections and folds
/// them into a job record once the load window closes.
#[derive(Debug, Clone)]
pub struct LoadRecorder {
    counters: Vec<ConnectionCounters>,
    latency: LatencyAggregator,
}

/// Outcome of a single request on a load connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestOutcome {
    /// A response arrived; `success` is false for non-2xx statuses.
    Response { latency_ms: f64, success: bool },
    /// The request never produced a response.
    SocketError,
}

impl LoadRecorder {
    #[must_use]
    pub fn new(mode: LatencyMode, connections: usize) -> Self {
        Self {
            counters: vec![ConnectionCounters::default(); connections],
            latency: LatencyAggregator::new(mode, connections),
        }
    }

    /// # Errors
    ///
    /// Returns [`StatsError::ConnectionOutOfRange`] for an unknown index.
    pub fn record(&mut self, index: usize, outcome: RequestOutcome) -> Result<(), StatsError> {
        let connections = self.counters.len();
        let counters = self
            .counters
            .get_mut(index)
            .ok_or(StatsError::ConnectionOutOfRange { index, connections })?;

        match outcome {
            RequestOutcome::Response {
                latency_ms,
                success,
            } => {
                counters.requests = counters.requests.saturating_add(1);
                if !success {
                    counters.bad_responses = counters.bad_responses.saturating_add(1);
                }
                self.latency.record(index, latency_ms)
            }
            RequestOutcome::SocketError => {
                counters.socket_errors = counters.socket_errors.saturating_add(1);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn totals(&self) -> ConnectionCounters {
        self.counters
            .iter()
            .fold(ConnectionCounters::default(), |acc, counters| ConnectionCounters {
                requests: acc.requests.saturating_add(counters.requests),
                bad_responses: acc.bad_responses.saturating_add(counters.bad_responses),
                socket_errors: acc.socket_errors.saturating_add(counters.socket_errors),
            })
    }

    /// Writes throughput, counters, and latency into `job`.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::NoElapsedTime`] for an empty load window and
    /// [`StatsError::NoLatencySamples`] when no response was recorded.
    pub fn apply_to(&mut self, elapsed: Duration, job: &mut JobRecord) -> Result<(), StatsError> {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        if elapsed_ms == 0 {
            return Err(StatsError::NoElapsedTime);
        }

        let totals = self.totals();
        job.requests = totals.requests;
        job.bad_responses = totals.bad_responses;
        job.socket_errors = totals.socket_errors;
        job.requests_per_second = totals.requests as f64 / elapsed_ms as f64 * 1000.0;
        job.actual_duration_ms = Some(elapsed_ms);
        job.latency = self.latency.reduce()?;
        Ok(())
    }
}
