use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Percentile requested over an empty sample set.")]
    EmptySamples,
    #[error(
        "Cannot exclude {exclude} runs from each end of {count} samples; at least one sample must remain."
    )]
    InsufficientSamples { count: usize, exclude: usize },
    #[error("Connection index {index} is out of range ({connections} connections).")]
    ConnectionOutOfRange { index: usize, connections: usize },
    #[error("No latency samples were recorded.")]
    NoLatencySamples,
    #[error("Latency totals cannot be merged into a detailed aggregator.")]
    TotalsInDetailedMode,
    #[error("Load ran for zero milliseconds; the job failed to run.")]
    NoElapsedTime,
    #[error("Measurement '{name}' has a non-numeric value: {value}")]
    NonNumericMeasurement { name: String, value: String },
    #[error("Measurement '{name}' has no values.")]
    EmptyMeasurement { name: String },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
