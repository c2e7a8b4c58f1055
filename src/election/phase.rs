use serde::{Deserialize, Serialize};

/// Lifecycle phase of a single election cycle.
///
/// Phases only move forward, one edge at a time; the sole back-edge is the
/// explicit reset to `RegisteringVoters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    RegisteringVoters,
    ProposalsRegistrationOpen,
    ProposalsRegistrationClosed,
    VotingOpen,
    VotingClosed,
    Tallied,
}

impl Phase {
    /// The phase that follows this one, or `None` from the terminal phase.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::RegisteringVoters => Some(Phase::ProposalsRegistrationOpen),
            Phase::ProposalsRegistrationOpen => Some(Phase::ProposalsRegistrationClosed),
            Phase::ProposalsRegistrationClosed => Some(Phase::VotingOpen),
            Phase::VotingOpen => Some(Phase::VotingClosed),
            Phase::VotingClosed => Some(Phase::Tallied),
            Phase::Tallied => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Tallied
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::RegisteringVoters => "registering voters",
            Phase::ProposalsRegistrationOpen => "proposals registration open",
            Phase::ProposalsRegistrationClosed => "proposals registration closed",
            Phase::VotingOpen => "voting open",
            Phase::VotingClosed => "voting closed",
            Phase::Tallied => "tallied",
        };
        f.write_str(name)
    }
}
