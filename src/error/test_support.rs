use super::{ConfigError, JobError, StatsError};

impl From<&'static str> for ConfigError {
    fn from(message: &'static str) -> Self {
        ConfigError::TestExpectation { message }
    }
}

impl From<String> for ConfigError {
    fn from(value: String) -> Self {
        ConfigError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for JobError {
    fn from(message: &'static str) -> Self {
        JobError::TestExpectation { message }
    }
}

impl From<String> for JobError {
    fn from(value: String) -> Self {
        JobError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for StatsError {
    fn from(message: &'static str) -> Self {
        StatsError::TestExpectation { message }
    }
}

impl From<String> for StatsError {
    fn from(value: String) -> Self {
        StatsError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}
