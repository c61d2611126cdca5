use serde_json::Value;
use tracing::warn;

use crate::job::{FORMAT_JSON, FORMAT_OBJECT, JobRecord};

/// Replaces JSON-text measurements with parsed objects and re-tags their
/// metadata as `object` so they are stored but not rendered.
pub fn normalize_measurements(job: &mut JobRecord) {
    for metadata in &mut job.metadata {
        if metadata.format != FORMAT_JSON {
            continue;
        }

        for measurement in &mut job.measurements {
            if measurement.name != metadata.name {
                continue;
            }
            let Value::String(text) = &measurement.value else {
                continue;
            };
            match serde_json::from_str::<Value>(text) {
                Ok(parsed) => measurement.value = parsed,
                Err(err) => warn!(
                    "Measurement '{}' is not valid JSON, keeping it as text: {}",
                    measurement.name, err
                ),
            }
        }

        FORMAT_OBJECT.clone_into(&mut metadata.format);
    }
}
