//! Measurement reduction, the results document, and console rendering.
mod aggregate;
mod document;
mod format;
mod iteration;
mod normalize;
mod render;


pub use aggregate::{MeasurementSummary, apply_operation, reduce_runs, summarize};
pub use document::{JobResult, JobResults};
pub use format::format_value;
pub use iteration::{IterationJob, iteration_statistics};
pub use normalize::normalize_measurements;
pub use render::render_measures;
