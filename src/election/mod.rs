pub mod engine;
pub mod error;
pub mod events;
pub mod phase;
pub mod state;
pub mod tally;

pub use engine::{PhaseTransition, RemovalTarget, WorkflowEngine};
pub use error::ElectionError;
pub use events::{ElectionEvent, EventSink, NullSink, RecordingSink, TracingSink};
pub use phase::Phase;
pub use state::{ElectionState, Proposal, Voter, VoterId};
pub use tally::Tally;
