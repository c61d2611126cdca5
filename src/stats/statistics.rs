use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StatsError;

/// Iteration-level benchmark figures. Several iterations are reduced into
/// one with [`reduce_statistics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Statistics {
    pub description: String,
    #[serde(rename = "RPS")]
    pub rps: f64,
    pub cpu: f64,
    pub working_set: f64,
    pub startup_main: f64,
    pub first_request: f64,
    pub latency: f64,
    pub latency_on_load: f64,
    pub latency_average: f64,
    pub latency50: f64,
    pub latency75: f64,
    pub latency90: f64,
    pub latency99: f64,
    pub max_latency: f64,
    pub socket_errors: f64,
    pub bad_responses: f64,
    pub total_requests: f64,
    pub duration: f64,
    pub other: BTreeMap<String, f64>,
}

/// Rounds half-to-even at `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Decimal places reported for a named figure.
#[must_use]
pub fn precision_of(name: &str) -> i32 {
    match name {
        "RPS" | "Cpu" | "WorkingSet" | "StartupMain" | "SocketErrors" | "BadResponses"
        | "TotalRequests" | "Duration" => 0,
        "LatencyOnLoad" | "FirstRequest" | "Latency" | "LatencyAverage" | "Latency50"
        | "Latency75" | "Latency90" | "Latency99" | "MaxLatency" => 1,
        _ => 2,
    }
}

/// Trimmed mean over iterations: samples are ordered by RPS and `exclude`
/// entries are dropped from each end before averaging every field.
///
/// # Errors
///
/// Returns [`StatsError::InsufficientSamples`] unless at least one sample
/// survives the trim.
pub fn reduce_statistics(samples: &[Statistics], exclude: usize) -> Result<Statistics, StatsError> {
    let count = samples.len();
    let trimmed = exclude.saturating_mul(2);
    if trimmed >= count {
        return Err(StatsError::InsufficientSamples { count, exclude });
    }

    let mut ordered: Vec<&Statistics> = samples.iter().collect();
    ordered.sort_by(|left, right| left.rps.total_cmp(&right.rps));
    let kept = ordered
        .get(exclude..count.saturating_sub(exclude))
        .unwrap_or_default();

    let mean = |field: fn(&Statistics) -> f64, name: &str| {
        let total: f64 = kept.iter().map(|sample| field(sample)).sum();
        round_to(total / kept.len() as f64, precision_of(name))
    };

    let mut other_names: Vec<&String> = kept.iter().flat_map(|s| s.other.keys()).collect();
    other_names.sort();
    other_names.dedup();
    let other = other_names
        .into_iter()
        .map(|name| {
            let total: f64 = kept
                .iter()
                .map(|sample| sample.other.get(name).copied().unwrap_or_default())
                .sum();
            let value = round_to(total / kept.len() as f64, precision_of(name));
            (name.clone(), value)
        })
        .collect();

    Ok(Statistics {
        description: kept
            .first()
            .map(|sample| sample.description.clone())
            .unwrap_or_default(),
        rps: mean(|s| s.rps, "RPS"),
        cpu: mean(|s| s.cpu, "Cpu"),
        working_set: mean(|s| s.working_set, "WorkingSet"),
        startup_main: mean(|s| s.startup_main, "StartupMain"),
        first_request: mean(|s| s.first_request, "FirstRequest"),
        latency: mean(|s| s.latency, "Latency"),
        latency_on_load: mean(|s| s.latency_on_load, "LatencyOnLoad"),
        latency_average: mean(|s| s.latency_average, "LatencyAverage"),
        latency50: mean(|s| s.latency50, "Latency50"),
        latency75: mean(|s| s.latency75, "Latency75"),
        latency90: mean(|s| s.latency90, "Latency90"),
        latency99: mean(|s| s.latency99, "Latency99"),
        max_latency: mean(|s| s.max_latency, "MaxLatency"),
        socket_errors: mean(|s| s.socket_errors, "SocketErrors"),
        bad_responses: mean(|s| s.bad_responses, "BadResponses"),
        total_requests: mean(|s| s.total_requests, "TotalRequests"),
        duration: mean(|s| s.duration, "Duration"),
        other,
    })
}
