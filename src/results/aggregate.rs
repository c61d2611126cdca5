use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StatsError;
use crate::job::{Measurement, MeasurementMetadata, Operation};
use crate::stats::{percentile, sort_samples};

/// One reduced value per metadata entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSummary {
    pub name: String,
    pub value: Value,
}

/// Folds raw measurements with each metadata entry's operator. Output
/// follows metadata order; metadata without values is skipped.
///
/// # Errors
///
/// Returns [`StatsError::NonNumericMeasurement`] when an arithmetic operator
/// meets a value that cannot be read as a number.
pub fn summarize(
    measurements: &[Measurement],
    metadata: &[MeasurementMetadata],
) -> Result<Vec<MeasurementSummary>, StatsError> {
    let mut grouped: BTreeMap<&str, Vec<&Value>> = BTreeMap::new();
    for measurement in measurements {
        grouped
            .entry(measurement.name.as_str())
            .or_default()
            .push(&measurement.value);
    }

    let mut summaries = Vec::with_capacity(metadata.len());
    for entry in metadata {
        let Some(values) = grouped.get(entry.name.as_str()) else {
            continue;
        };
        summaries.push(summarize_entry(entry, values)?);
    }
    Ok(summaries)
}

/// Combines per-run summaries with the same operators. A single run is
/// returned unchanged.
///
/// # Errors
///
/// Same as [`summarize`].
pub fn reduce_runs(
    runs: &[Vec<MeasurementSummary>],
    metadata: &[MeasurementMetadata],
) -> Result<Vec<MeasurementSummary>, StatsError> {
    if let [single] = runs {
        return Ok(single.clone());
    }

    let mut summaries = Vec::with_capacity(metadata.len());
    for entry in metadata {
        let values: Vec<&Value> = runs
            .iter()
            .flat_map(|run| run.iter())
            .filter(|summary| summary.name == entry.name)
            .map(|summary| &summary.value)
            .collect();
        if values.is_empty() {
            continue;
        }
        summaries.push(summarize_entry(entry, &values)?);
    }
    Ok(summaries)
}

fn summarize_entry(
    entry: &MeasurementMetadata,
    values: &[&Value],
) -> Result<MeasurementSummary, StatsError> {
    let mut value = apply_operation(&entry.name, entry.aggregate, values)?;
    if entry.is_numeric() && !matches!(value, Value::Array(_)) {
        value = Value::from(as_number(&entry.name, &value)?);
    }
    Ok(MeasurementSummary {
        name: entry.name.clone(),
        value,
    })
}

/// Applies `operation` to the values of one measurement family.
///
/// # Errors
///
/// Returns [`StatsError::EmptyMeasurement`] for an empty family and
/// [`StatsError::NonNumericMeasurement`] for arithmetic over text.
pub fn apply_operation(
    name: &str,
    operation: Operation,
    values: &[&Value],
) -> Result<Value, StatsError> {
    let empty = || StatsError::EmptyMeasurement {
        name: name.to_owned(),
    };

    let reduced = match operation {
        Operation::First => {
            return values.first().map(|value| (*value).clone()).ok_or_else(empty);
        }
        Operation::Last => {
            return values.last().map(|value| (*value).clone()).ok_or_else(empty);
        }
        Operation::Count => return Ok(Value::from(values.len())),
        Operation::All => {
            return Ok(Value::Array(
                values.iter().map(|value| (*value).clone()).collect(),
            ));
        }
        Operation::Avg => {
            let numbers = sorted_numbers(name, values)?;
            numbers.iter().sum::<f64>() / numbers.len() as f64
        }
        Operation::Sum => sorted_numbers(name, values)?.iter().sum(),
        Operation::Median => percentile(50, &sorted_numbers(name, values)?)?,
        Operation::Max => edges(&sorted_numbers(name, values)?).1,
        Operation::Min => edges(&sorted_numbers(name, values)?).0,
        Operation::Delta => {
            let (min, max) = edges(&sorted_numbers(name, values)?);
            max - min
        }
    };
    Ok(Value::from(reduced))
}

fn sorted_numbers(name: &str, values: &[&Value]) -> Result<Vec<f64>, StatsError> {
    let mut numbers = values
        .iter()
        .map(|value| as_number(name, value))
        .collect::<Result<Vec<f64>, StatsError>>()?;
    if numbers.is_empty() {
        return Err(StatsError::EmptyMeasurement {
            name: name.to_owned(),
        });
    }
    sort_samples(&mut numbers);
    Ok(numbers)
}

fn edges(sorted: &[f64]) -> (f64, f64) {
    (
        sorted.first().copied().unwrap_or_default(),
        sorted.last().copied().unwrap_or_default(),
    )
}

/// Reads a JSON number, or a string holding one.
fn as_number(name: &str, value: &Value) -> Result<f64, StatsError> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.ok_or_else(|| StatsError::NonNumericMeasurement {
        name: name.to_owned(),
        value: value.to_string(),
    })
}
