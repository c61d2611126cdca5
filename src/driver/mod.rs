//! Job lifecycle against remote agents: transport, per-agent connections,
//! keep-alive sessions, and scenario orchestration.
mod attachments;
mod connection;
mod http;
mod orchestrator;
mod retry;
mod session;
mod timings;
mod transport;


pub use attachments::{ResolvedAttachment, resolve_attachments};
pub use connection::{JobConnection, StartOutcome};
pub use http::{HttpAgentTransport, HttpTransportFactory, build_agent_client};
pub use orchestrator::{
    JobOutcome, JobStatus, ScenarioReport, ScenarioRun, TransportFactory, run_scenario,
};
pub use retry::with_retry;
pub use session::StopOutcome;
pub use timings::{DRIVER_VERSION, LifecycleTimings, MIN_AGENT_VERSION, RetryPolicy};
pub use transport::{AgentTransport, DeleteOutcome, LogKind};
