//! Ground station service.
//!
//! Runs star tracking analyses on demand, either by delegating to an external
//! analysis program or by running the in-process pipeline, and relays their
//! progress, results and live telemetry to observers through a shared event
//! hub.

pub mod config;
pub mod events;
pub mod orchestrator;
pub mod process_table;
pub mod server;
pub mod telemetry;

pub use events::{EventHub, EventSink, EventSubscriber, ObserverId};
pub use orchestrator::{AnalysisError, AnalysisOrchestrator, AnalysisRun, RunState};
pub use process_table::{ProcessLease, ProcessTable};
