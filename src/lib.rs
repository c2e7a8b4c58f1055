// Scrutineer - single-election voting workflow engine.
// The library owns the workflow state machine, vote bookkeeping, and tally;
// the binary is a thin scenario-driven adapter on top.

pub mod auth;
pub mod cli;
pub mod config;
pub mod election;
pub mod scenario;
pub mod telemetry;

// Re-export key types for easy access
pub use auth::{AdminGate, SingleAdmin};
pub use config::ElectionPolicy;
pub use election::{
    ElectionError, ElectionEvent, EventSink, NullSink, Phase, PhaseTransition, Proposal,
    RecordingSink, RemovalTarget, TracingSink, Voter, VoterId, WorkflowEngine,
};
pub use scenario::{Scenario, Step};
pub use telemetry::init_telemetry;
