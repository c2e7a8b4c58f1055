use std::collections::BTreeMap;

use super::state::Proposal;

/// Outcome of scanning the proposal list at close-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    /// Lowest id among the proposals that reached the maximum vote count.
    pub winning_id: u32,
    pub winning_votes: u32,
    /// How many proposals share the maximum. 1 means a unique winner.
    pub contenders: usize,
}

/// Deterministic winner selection over the live proposals.
///
/// Pass one walks ids in ascending order and records the first proposal to
/// reach the running maximum, so ties resolve to the lowest id. Pass two
/// counts how many proposals sit at that maximum; the caller decides whether
/// more than one contender is acceptable.
pub fn run(proposals: &BTreeMap<u32, Proposal>) -> Option<Tally> {
    let mut leader: Option<(u32, u32)> = None;
    for (&id, proposal) in proposals {
        match leader {
            Some((_, votes)) if proposal.vote_count <= votes => {}
            _ => leader = Some((id, proposal.vote_count)),
        }
    }
    let (winning_id, winning_votes) = leader?;

    let contenders = proposals
        .values()
        .filter(|p| p.vote_count == winning_votes)
        .count();

    Some(Tally {
        winning_id,
        winning_votes,
        contenders,
    })
}
