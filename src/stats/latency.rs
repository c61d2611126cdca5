use crate::error::StatsError;
use crate::job::LatencySummary;

use super::percentile::{percentile, sort_samples};

/// How much latency data each connection keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyMode {
    /// Every sample is kept so percentiles can be computed.
    Detailed,
    /// Only a running sum and count; percentiles stay at the sentinel.
    Summary,
}

#[derive(Debug, Clone)]
enum ConnectionLatency {
    Detailed(Vec<f64>),
    Summary { sum: f64, count: u64 },
}

impl ConnectionLatency {
    const fn new(mode: LatencyMode) -> Self {
        match mode {
            LatencyMode::Detailed => ConnectionLatency::Detailed(Vec::new()),
            LatencyMode::Summary => ConnectionLatency::Summary { sum: 0.0, count: 0 },
        }
    }
}

/// Per-connection latency collection merged into one job-level summary.
///
/// Each load connection owns a slot; slots are written independently and
/// only merged by [`LatencyAggregator::reduce`].
#[derive(Debug, Clone)]
pub struct LatencyAggregator {
    mode: LatencyMode,
    connections: Vec<ConnectionLatency>,
}

impl LatencyAggregator {
    #[must_use]
    pub fn new(mode: LatencyMode, connections: usize) -> Self {
        Self {
            mode,
            connections: (0..connections)
                .map(|_| ConnectionLatency::new(mode))
                .collect(),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> LatencyMode {
        self.mode
    }

    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.len()
    }

    /// Records one request latency in milliseconds for a connection.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::ConnectionOutOfRange`] for an unknown index.
    pub fn record(&mut self, index: usize, latency_ms: f64) -> Result<(), StatsError> {
        match self.slot(index)? {
            ConnectionLatency::Detailed(samples) => samples.push(latency_ms),
            ConnectionLatency::Summary { sum, count } => {
                *sum += latency_ms;
                *count = count.saturating_add(1);
            }
        }
        Ok(())
    }

    /// Merges a connection's pre-aggregated totals.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::ConnectionOutOfRange`] for an unknown index and
    /// [`StatsError::TotalsInDetailedMode`] when raw samples are expected.
    pub fn record_totals(
        &mut self,
        index: usize,
        total_ms: f64,
        samples: u64,
    ) -> Result<(), StatsError> {
        match self.slot(index)? {
            ConnectionLatency::Detailed(_) => Err(StatsError::TotalsInDetailedMode),
            ConnectionLatency::Summary { sum, count } => {
                *sum += total_ms;
                *count = count.saturating_add(samples);
                Ok(())
            }
        }
    }

    fn slot(&mut self, index: usize) -> Result<&mut ConnectionLatency, StatsError> {
        let connections = self.connections.len();
        self.connections
            .get_mut(index)
            .ok_or(StatsError::ConnectionOutOfRange { index, connections })
    }

    /// Merges every connection into a job-level summary. Detailed
    /// connections are left sorted ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::NoLatencySamples`] when nothing was recorded.
    pub fn reduce(&mut self) -> Result<LatencySummary, StatsError> {
        match self.mode {
            LatencyMode::Detailed => self.reduce_detailed(),
            LatencyMode::Summary => self.reduce_summary(),
        }
    }

    fn reduce_detailed(&mut self) -> Result<LatencySummary, StatsError> {
        let mut pooled = Vec::new();
        for connection in &mut self.connections {
            if let ConnectionLatency::Detailed(samples) = connection {
                sort_samples(samples);
                pooled.extend_from_slice(samples);
            }
        }
        if pooled.is_empty() {
            return Err(StatsError::NoLatencySamples);
        }
        sort_samples(&mut pooled);

        let total: f64 = pooled.iter().sum();
        let average = total / pooled.len() as f64;

        Ok(LatencySummary {
            average,
            within_p50: percentile(50, &pooled)?,
            within_p75: percentile(75, &pooled)?,
            within_p90: percentile(90, &pooled)?,
            within_p99: percentile(99, &pooled)?,
            max_latency: percentile(100, &pooled)?,
        })
    }

    fn reduce_summary(&self) -> Result<LatencySummary, StatsError> {
        let (total, count) = self.connections.iter().fold(
            (0.0_f64, 0_u64),
            |(total, count), connection| match connection {
                ConnectionLatency::Summary { sum, count: samples } => {
                    (total + sum, count.saturating_add(*samples))
                }
                ConnectionLatency::Detailed(_) => (total, count),
            },
        );
        if count == 0 {
            return Err(StatsError::NoLatencySamples);
        }

        Ok(LatencySummary {
            average: total / count as f64,
            ..LatencySummary::default()
        })
    }
}
