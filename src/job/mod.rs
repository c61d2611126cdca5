//! Job definition and measurement data model shared with the agent.
mod headers;
mod measurement;
mod record;
mod state;


pub use headers::HeaderList;
pub use measurement::{FORMAT_JSON, FORMAT_OBJECT, Measurement, MeasurementMetadata, Operation};
pub use record::{
    Attachment, AttachmentKind, DEFAULT_CONNECTIONS, JobOptions, JobRecord, LatencySummary,
    NOT_COMPUTED, OperatingSystem,
};
pub use state::JobState;
