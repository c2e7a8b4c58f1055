use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::phase::Phase;

/// Opaque caller identity. Used both for authorization checks and as the
/// voter registry key; the engine never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoterId(pub String);

impl VoterId {
    pub fn new(id: impl Into<String>) -> Self {
        VoterId(id.into())
    }
}

impl std::fmt::Display for VoterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VoterId {
    fn from(id: &str) -> Self {
        VoterId(id.to_string())
    }
}

impl From<String> for VoterId {
    fn from(id: String) -> Self {
        VoterId(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub registered: bool,
    pub has_voted: bool,
    pub voted_proposal: Option<u32>,
}

impl Voter {
    pub fn registered() -> Self {
        Voter {
            registered: true,
            has_voted: false,
            voted_proposal: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub description: String,
    pub vote_count: u32,
}

impl Proposal {
    pub fn new(description: impl Into<String>) -> Self {
        Proposal {
            description: description.into(),
            vote_count: 0,
        }
    }
}

/// Complete mutable state of one election cycle.
///
/// Proposals are keyed by id so removal-by-id leaves a real hole rather than
/// shifting indices; iteration order over the map is id order, which equals
/// insertion order because ids are assigned sequentially.
#[derive(Debug)]
pub struct ElectionState {
    pub phase: Phase,
    pub voters: HashMap<VoterId, Voter>,
    pub proposals: BTreeMap<u32, Proposal>,
    pub next_proposal_id: u32,
    pub winning_proposal: Option<u32>,
    pub cycle_id: Uuid,
}

impl ElectionState {
    pub fn new() -> Self {
        ElectionState {
            phase: Phase::RegisteringVoters,
            voters: HashMap::new(),
            proposals: BTreeMap::new(),
            next_proposal_id: 0,
            winning_proposal: None,
            cycle_id: Uuid::new_v4(),
        }
    }

    /// Id handed to the next registered proposal. Ids start at 1 and are
    /// never reused within a cycle, even after removals.
    pub fn assign_proposal_id(&mut self) -> u32 {
        self.next_proposal_id += 1;
        self.next_proposal_id
    }

    pub fn last_assigned_id(&self) -> u32 {
        self.next_proposal_id
    }

    pub fn votes_cast(&self) -> usize {
        self.voters.values().filter(|v| v.has_voted).count()
    }

    /// Wipe everything and start a fresh cycle under a new correlation id.
    pub fn clear(&mut self) {
        self.phase = Phase::RegisteringVoters;
        self.voters.clear();
        self.proposals.clear();
        self.next_proposal_id = 0;
        self.winning_proposal = None;
        self.cycle_id = Uuid::new_v4();
    }
}

impl Default for ElectionState {
    fn default() -> Self {
        Self::new()
    }
}
