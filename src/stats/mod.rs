//! Percentiles, latency aggregation, load counters, and iteration reduction.
mod counters;
mod latency;
mod percentile;
mod statistics;


pub use counters::{ConnectionCounters, LoadRecorder, RequestOutcome};
pub use latency::{LatencyAggregator, LatencyMode};
pub use percentile::{MAX_PERCENT, percentile, sort_samples};
pub use statistics::{Statistics, precision_of, reduce_statistics, round_to};
