use serde_json::Value;

use crate::job::{JobRecord, NOT_COMPUTED};
use crate::stats::Statistics;

use super::aggregate::MeasurementSummary;

const CPU: &str = "benchmarks/cpu";
const WORKING_SET: &str = "benchmarks/working-set";
const START_TIME: &str = "benchmarks/start-time";
const FIRST_REQUEST: &str = "http/firstrequest";
const LATENCY: &str = "http/latency";

/// Records and reduced summaries of one job within an iteration.
#[derive(Debug, Clone, Copy)]
pub struct IterationJob<'run> {
    pub name: &'run str,
    pub records: &'run [JobRecord],
    pub summaries: &'run [MeasurementSummary],
}

/// Builds the statistics row for one iteration.
///
/// Load figures come from records that issued requests: throughput and
/// counters are summed, average latencies are averaged and percentiles take
/// the worst connection. Server figures come from well-known measurement
/// names; every other numeric summary lands in `other` as `job/name`.
#[must_use]
pub fn iteration_statistics(description: &str, jobs: &[IterationJob<'_>]) -> Statistics {
    let mut statistics = Statistics {
        description: description.to_owned(),
        latency: NOT_COMPUTED,
        latency_on_load: NOT_COMPUTED,
        latency_average: NOT_COMPUTED,
        latency50: NOT_COMPUTED,
        latency75: NOT_COMPUTED,
        latency90: NOT_COMPUTED,
        latency99: NOT_COMPUTED,
        max_latency: NOT_COMPUTED,
        startup_main: NOT_COMPUTED,
        first_request: NOT_COMPUTED,
        ..Statistics::default()
    };

    let load: Vec<&JobRecord> = jobs
        .iter()
        .flat_map(|job| job.records.iter())
        .filter(|record| record.requests > 0)
        .collect();

    let mut averages = Vec::new();
    for record in &load {
        statistics.rps += record.requests_per_second;
        statistics.total_requests += record.requests as f64;
        statistics.bad_responses += record.bad_responses as f64;
        statistics.socket_errors += record.socket_errors as f64;

        let seconds = record
            .actual_duration_ms
            .map_or(record.duration as f64, |ms| ms as f64 / 1000.0);
        statistics.duration = statistics.duration.max(seconds);

        if record.latency.average >= 0.0 {
            averages.push(record.latency.average);
        }
        if record.latency.has_percentiles() {
            statistics.latency50 = statistics.latency50.max(record.latency.within_p50);
            statistics.latency75 = statistics.latency75.max(record.latency.within_p75);
            statistics.latency90 = statistics.latency90.max(record.latency.within_p90);
            statistics.latency99 = statistics.latency99.max(record.latency.within_p99);
            statistics.max_latency = statistics.max_latency.max(record.latency.max_latency);
        }
    }
    if !averages.is_empty() {
        let mean = averages.iter().sum::<f64>() / averages.len() as f64;
        statistics.latency_average = mean;
        statistics.latency_on_load = mean;
    }

    for job in jobs {
        for summary in job.summaries {
            let Some(value) = numeric(&summary.value) else {
                continue;
            };
            match summary.name.as_str() {
                CPU => statistics.cpu = statistics.cpu.max(value),
                WORKING_SET => statistics.working_set = statistics.working_set.max(value),
                START_TIME => statistics.startup_main = value,
                FIRST_REQUEST => statistics.first_request = value,
                LATENCY => statistics.latency = value,
                _ => {
                    statistics
                        .other
                        .insert(format!("{}/{}", job.name, summary.name), value);
                }
            }
        }
    }

    statistics
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(_) | Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            None
        }
    }
}
