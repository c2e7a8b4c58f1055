use thiserror::Error;

use super::phase::Phase;
use super::state::VoterId;

/// Every way a guarded election operation can be refused. All variants are
/// synchronous and non-retryable; a returned error guarantees the operation
/// mutated nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElectionError {
    #[error("caller {caller} is not authorized to {action}")]
    Unauthorized { caller: VoterId, action: &'static str },

    #[error("{operation} is not allowed while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: Phase,
    },

    #[error("voter {0} is already registered")]
    AlreadyRegistered(VoterId),

    #[error("{0} is not a registered voter")]
    NotRegistered(VoterId),

    #[error("proposal id {0} does not reference a live proposal")]
    InvalidProposalId(u32),

    #[error("proposal description must not be empty")]
    EmptyProposal,

    #[error("voter {0} has already cast a ballot this cycle")]
    AlreadyVoted(VoterId),

    #[error("voter {0} has not cast a ballot this cycle")]
    HasNotVoted(VoterId),

    #[error("cannot advance while {phase}: {requirement}")]
    NoQuorum {
        phase: Phase,
        requirement: &'static str,
    },

    #[error("tally found {count} proposals tied at {votes} votes")]
    TieDetected { count: usize, votes: u32 },
}
