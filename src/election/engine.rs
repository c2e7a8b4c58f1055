use chrono::Utc;
use tracing::{info, warn};

use crate::auth::AdminGate;
use crate::config::ElectionPolicy;

use super::error::ElectionError;
use super::events::{ElectionEvent, EventSink, NullSink};
use super::phase::Phase;
use super::state::{ElectionState, Proposal, Voter, VoterId};
use super::tally;

/// Which proposal a removal call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalTarget {
    /// Remove a specific id, leaving a hole in the id sequence.
    Id(u32),
    /// Remove the most recently added live proposal.
    Last,
}

/// Outcome of a successful phase advance, including the status line shown to
/// the administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub message: String,
}

/// The election workflow state machine.
///
/// One engine owns one election cycle's state outright; nothing else mutates
/// it. Every mutating operation validates all of its preconditions before
/// touching state, so a returned error always means nothing changed. Events
/// are published only after the mutation commits.
pub struct WorkflowEngine {
    state: ElectionState,
    policy: ElectionPolicy,
    gate: Box<dyn AdminGate>,
    sink: Box<dyn EventSink>,
}

impl WorkflowEngine {
    pub fn new(gate: Box<dyn AdminGate>) -> Self {
        WorkflowEngine {
            state: ElectionState::new(),
            policy: ElectionPolicy::default(),
            gate,
            sink: Box::new(NullSink),
        }
    }

    pub fn with_policy(mut self, policy: ElectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    // ---- guards ----------------------------------------------------------

    fn require_admin(
        &self,
        caller: &VoterId,
        action: &'static str,
    ) -> Result<(), ElectionError> {
        if self.gate.is_admin(caller) {
            Ok(())
        } else {
            warn!(caller = %caller, action, "unauthorized call rejected");
            Err(ElectionError::Unauthorized {
                caller: caller.clone(),
                action,
            })
        }
    }

    fn require_phase(
        &self,
        expected: Phase,
        operation: &'static str,
    ) -> Result<(), ElectionError> {
        if self.state.phase == expected {
            Ok(())
        } else {
            Err(ElectionError::InvalidPhase {
                operation,
                phase: self.state.phase,
            })
        }
    }

    fn require_registered(&self, identity: &VoterId) -> Result<&Voter, ElectionError> {
        self.state
            .voters
            .get(identity)
            .filter(|v| v.registered)
            .ok_or_else(|| ElectionError::NotRegistered(identity.clone()))
    }

    // ---- administrator operations ----------------------------------------

    /// Admit a voter to the current cycle. Registration is add-only: the same
    /// identity cannot be admitted twice before a reset.
    pub fn register_voter(
        &mut self,
        caller: &VoterId,
        voter: VoterId,
    ) -> Result<(), ElectionError> {
        self.require_admin(caller, "register voters")?;
        self.require_phase(Phase::RegisteringVoters, "voter registration")?;
        if self.state.voters.contains_key(&voter) {
            return Err(ElectionError::AlreadyRegistered(voter));
        }

        self.state.voters.insert(voter.clone(), Voter::registered());
        info!(
            cycle = %self.state.cycle_id,
            voter = %voter,
            registered = self.state.voters.len(),
            "voter registered"
        );
        self.sink.publish(ElectionEvent::VoterRegistered { voter });
        Ok(())
    }

    /// Move the workflow one phase forward. The transition into the tallied
    /// phase runs the tally and announces the winner.
    pub fn advance_phase(&mut self, caller: &VoterId) -> Result<PhaseTransition, ElectionError> {
        self.require_admin(caller, "advance the workflow phase")?;
        let from = self.state.phase;
        let to = from.next().ok_or(ElectionError::InvalidPhase {
            operation: "phase advance",
            phase: from,
        })?;

        let message = match to {
            Phase::ProposalsRegistrationOpen => {
                if self.state.voters.is_empty() {
                    return Err(ElectionError::NoQuorum {
                        phase: from,
                        requirement: "at least one registered voter",
                    });
                }
                format!(
                    "Proposal registration is now open ({} voters admitted)",
                    self.state.voters.len()
                )
            }
            Phase::ProposalsRegistrationClosed => {
                if self.state.proposals.is_empty() {
                    return Err(ElectionError::NoQuorum {
                        phase: from,
                        requirement: "at least one proposal",
                    });
                }
                format!(
                    "Proposal registration is closed ({} proposals on the ballot)",
                    self.state.proposals.len()
                )
            }
            Phase::VotingOpen => "The voting session is now open".to_string(),
            Phase::VotingClosed => {
                let cast = self.state.votes_cast();
                if self.policy.require_vote_before_close && cast == 0 {
                    return Err(ElectionError::NoQuorum {
                        phase: from,
                        requirement: "at least one cast vote",
                    });
                }
                format!("The voting session is closed ({cast} ballots cast)")
            }
            Phase::Tallied => {
                let tally =
                    tally::run(&self.state.proposals).ok_or(ElectionError::NoQuorum {
                        phase: from,
                        requirement: "at least one proposal to tally",
                    })?;
                if self.policy.require_unique_winner && tally.contenders > 1 {
                    return Err(ElectionError::TieDetected {
                        count: tally.contenders,
                        votes: tally.winning_votes,
                    });
                }
                self.state.winning_proposal = Some(tally.winning_id);
                let description = self.state.proposals[&tally.winning_id].description.clone();
                let message = format!(
                    "Votes tallied: \"{description}\" wins with {} votes",
                    tally.winning_votes
                );

                self.state.phase = to;
                info!(
                    cycle = %self.state.cycle_id,
                    winner = %tally.winning_id,
                    votes = tally.winning_votes,
                    "tally complete"
                );
                self.sink.publish(ElectionEvent::PhaseChanged { from, to });
                self.sink
                    .publish(ElectionEvent::WinnerAnnounced { description });
                return Ok(PhaseTransition { from, to, message });
            }
            Phase::RegisteringVoters => unreachable!("forward edges never re-enter the initial phase"),
        };

        self.state.phase = to;
        info!(cycle = %self.state.cycle_id, from = %from, to = %to, "phase advanced");
        self.sink.publish(ElectionEvent::PhaseChanged { from, to });
        Ok(PhaseTransition { from, to, message })
    }

    /// Clear every voter, proposal, and result and return to the initial
    /// phase. Gated to the tallied phase when the policy demands it.
    pub fn reset_election(&mut self, caller: &VoterId) -> Result<(), ElectionError> {
        self.require_admin(caller, "reset the election")?;
        if self.policy.reset_requires_tally {
            self.require_phase(Phase::Tallied, "election reset")?;
        }

        let old_cycle = self.state.cycle_id;
        self.state.clear();
        let at = Utc::now();
        info!(
            old_cycle = %old_cycle,
            new_cycle = %self.state.cycle_id,
            "election reset"
        );
        self.sink.publish(ElectionEvent::ElectionReset { at });
        Ok(())
    }

    /// Drop a proposal from the ballot while registration is still open.
    pub fn remove_proposal(
        &mut self,
        caller: &VoterId,
        target: RemovalTarget,
    ) -> Result<u32, ElectionError> {
        self.require_admin(caller, "remove proposals")?;
        self.require_phase(Phase::ProposalsRegistrationOpen, "proposal removal")?;

        let id = match target {
            RemovalTarget::Id(id) => {
                if !self.state.proposals.contains_key(&id) {
                    return Err(ElectionError::InvalidProposalId(id));
                }
                id
            }
            RemovalTarget::Last => *self
                .state
                .proposals
                .keys()
                .next_back()
                .ok_or(ElectionError::InvalidProposalId(0))?,
        };

        self.state.proposals.remove(&id);
        info!(cycle = %self.state.cycle_id, proposal = %id, "proposal removed");
        self.sink.publish(ElectionEvent::ProposalRemoved { id });
        Ok(id)
    }

    // ---- voter operations ------------------------------------------------

    /// Put a proposal on the ballot. Any registered voter may do so while
    /// proposal registration is open.
    pub fn add_proposal(
        &mut self,
        caller: &VoterId,
        description: &str,
    ) -> Result<u32, ElectionError> {
        self.require_registered(caller)?;
        self.require_phase(Phase::ProposalsRegistrationOpen, "proposal registration")?;
        if self.policy.reject_empty_descriptions && description.trim().is_empty() {
            return Err(ElectionError::EmptyProposal);
        }

        let id = self.state.assign_proposal_id();
        self.state.proposals.insert(id, Proposal::new(description));
        info!(
            cycle = %self.state.cycle_id,
            proposal = %id,
            by = %caller,
            "proposal registered"
        );
        self.sink.publish(ElectionEvent::ProposalRegistered { id });
        Ok(id)
    }

    /// Cast the caller's single ballot for the given proposal id.
    ///
    /// The id range check runs before any other guard so an out-of-range id
    /// is reported as such even when the phase or caller is also wrong.
    pub fn cast_vote(&mut self, caller: &VoterId, proposal_id: u32) -> Result<(), ElectionError> {
        if proposal_id == 0 || proposal_id > self.state.last_assigned_id() {
            return Err(ElectionError::InvalidProposalId(proposal_id));
        }
        let has_voted = self.require_registered(caller)?.has_voted;
        self.require_phase(Phase::VotingOpen, "voting")?;
        if has_voted {
            return Err(ElectionError::AlreadyVoted(caller.clone()));
        }
        // In range but removed during the proposals phase is a hard error.
        let proposal = self
            .state
            .proposals
            .get_mut(&proposal_id)
            .ok_or(ElectionError::InvalidProposalId(proposal_id))?;
        let voter = self
            .state
            .voters
            .get_mut(caller)
            .ok_or_else(|| ElectionError::NotRegistered(caller.clone()))?;

        voter.has_voted = true;
        voter.voted_proposal = Some(proposal_id);
        proposal.vote_count += 1;
        info!(
            cycle = %self.state.cycle_id,
            voter = %caller,
            proposal = %proposal_id,
            "vote cast"
        );
        self.sink.publish(ElectionEvent::VoteCast {
            voter: caller.clone(),
            proposal: proposal_id,
        });
        Ok(())
    }

    // ---- read-only queries -----------------------------------------------

    pub fn current_phase(&self) -> Phase {
        self.state.phase
    }

    /// Live proposals in id order. Removed ids are absent; callers must not
    /// assume dense indexing.
    pub fn proposals(&self) -> impl Iterator<Item = (u32, &Proposal)> + '_ {
        self.state.proposals.iter().map(|(&id, p)| (id, p))
    }

    /// Registry entries in no particular order.
    pub fn voters(&self) -> impl Iterator<Item = (&VoterId, &Voter)> + '_ {
        self.state.voters.iter()
    }

    pub fn registered_voter_count(&self) -> usize {
        self.state.voters.len()
    }

    pub fn votes_cast(&self) -> usize {
        self.state.votes_cast()
    }

    pub fn cycle_id(&self) -> uuid::Uuid {
        self.state.cycle_id
    }

    /// Description of the proposal the given identity voted for. Only
    /// answerable once the votes are tallied.
    pub fn show_vote(&self, identity: &VoterId) -> Result<&str, ElectionError> {
        self.require_phase(Phase::Tallied, "vote lookup")?;
        let voter = self.require_registered(identity)?;
        let id = voter
            .voted_proposal
            .ok_or_else(|| ElectionError::HasNotVoted(identity.clone()))?;
        let proposal = self
            .state
            .proposals
            .get(&id)
            .ok_or(ElectionError::InvalidProposalId(id))?;
        Ok(&proposal.description)
    }

    /// Description of the winning proposal. Only answerable once tallied.
    pub fn winner(&self) -> Result<&str, ElectionError> {
        self.require_phase(Phase::Tallied, "winner lookup")?;
        let id = self.state.winning_proposal.ok_or(ElectionError::InvalidPhase {
            operation: "winner lookup",
            phase: self.state.phase,
        })?;
        let proposal = self
            .state
            .proposals
            .get(&id)
            .ok_or(ElectionError::InvalidProposalId(id))?;
        Ok(&proposal.description)
    }
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("state", &self.state)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SingleAdmin;

    fn admin() -> VoterId {
        VoterId::from("admin")
    }

    fn engine() -> WorkflowEngine {
        WorkflowEngine::new(Box::new(SingleAdmin::new(admin())))
    }

    /// Engine driven to the voting-open phase with voters x and y and
    /// proposals 1 ("Cats") and 2 ("Dogs").
    fn engine_at_voting_open() -> WorkflowEngine {
        let mut engine = engine();
        let admin = admin();
        engine.register_voter(&admin, VoterId::from("x")).unwrap();
        engine.register_voter(&admin, VoterId::from("y")).unwrap();
        engine.advance_phase(&admin).unwrap();
        engine.add_proposal(&VoterId::from("x"), "Cats").unwrap();
        engine.add_proposal(&VoterId::from("y"), "Dogs").unwrap();
        engine.advance_phase(&admin).unwrap();
        engine.advance_phase(&admin).unwrap();
        engine
    }

    #[test]
    fn test_non_admin_cannot_register_or_advance() {
        let mut engine = engine();
        let mallory = VoterId::from("mallory");
        assert!(matches!(
            engine.register_voter(&mallory, VoterId::from("x")),
            Err(ElectionError::Unauthorized { .. })
        ));
        assert!(matches!(
            engine.advance_phase(&mallory),
            Err(ElectionError::Unauthorized { .. })
        ));
        assert_eq!(engine.current_phase(), Phase::RegisteringVoters);
    }

    #[test]
    fn test_duplicate_registration_is_rejected_without_mutation() {
        let mut engine = engine();
        engine.register_voter(&admin(), VoterId::from("x")).unwrap();
        let err = engine
            .register_voter(&admin(), VoterId::from("x"))
            .unwrap_err();
        assert_eq!(err, ElectionError::AlreadyRegistered(VoterId::from("x")));
        assert_eq!(engine.registered_voter_count(), 1);
    }

    #[test]
    fn test_advance_requires_voters_then_proposals() {
        let mut engine = engine();
        assert!(matches!(
            engine.advance_phase(&admin()),
            Err(ElectionError::NoQuorum { .. })
        ));

        engine.register_voter(&admin(), VoterId::from("x")).unwrap();
        let transition = engine.advance_phase(&admin()).unwrap();
        assert_eq!(transition.from, Phase::RegisteringVoters);
        assert_eq!(transition.to, Phase::ProposalsRegistrationOpen);

        // No proposals yet, so registration cannot close.
        assert!(matches!(
            engine.advance_phase(&admin()),
            Err(ElectionError::NoQuorum { .. })
        ));
    }

    #[test]
    fn test_proposal_registration_requires_registered_voter_and_open_phase() {
        let mut engine = engine();
        engine.register_voter(&admin(), VoterId::from("x")).unwrap();

        // Wrong phase for a registered voter.
        assert!(matches!(
            engine.add_proposal(&VoterId::from("x"), "Cats"),
            Err(ElectionError::InvalidPhase { .. })
        ));

        engine.advance_phase(&admin()).unwrap();
        assert!(matches!(
            engine.add_proposal(&VoterId::from("ghost"), "Cats"),
            Err(ElectionError::NotRegistered(_))
        ));
        assert_eq!(engine.add_proposal(&VoterId::from("x"), "Cats").unwrap(), 1);
        assert_eq!(engine.add_proposal(&VoterId::from("x"), "Dogs").unwrap(), 2);
    }

    #[test]
    fn test_blank_description_is_rejected_under_strict_policy() {
        let mut engine = engine();
        engine.register_voter(&admin(), VoterId::from("x")).unwrap();
        engine.advance_phase(&admin()).unwrap();
        assert_eq!(
            engine.add_proposal(&VoterId::from("x"), "   "),
            Err(ElectionError::EmptyProposal)
        );
        assert_eq!(engine.proposals().count(), 0);
    }

    #[test]
    fn test_removal_by_id_leaves_a_hole_and_ids_are_not_reused() {
        let mut engine = engine();
        engine.register_voter(&admin(), VoterId::from("x")).unwrap();
        engine.advance_phase(&admin()).unwrap();
        engine.add_proposal(&VoterId::from("x"), "Cats").unwrap();
        engine.add_proposal(&VoterId::from("x"), "Dogs").unwrap();

        assert_eq!(
            engine.remove_proposal(&admin(), RemovalTarget::Id(1)).unwrap(),
            1
        );
        let ids: Vec<u32> = engine.proposals().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![2]);

        // The freed id is not handed out again.
        assert_eq!(engine.add_proposal(&VoterId::from("x"), "Fish").unwrap(), 3);
        assert_eq!(
            engine.remove_proposal(&admin(), RemovalTarget::Id(1)),
            Err(ElectionError::InvalidProposalId(1))
        );
    }

    #[test]
    fn test_removal_of_last_pops_highest_live_id() {
        let mut engine = engine();
        engine.register_voter(&admin(), VoterId::from("x")).unwrap();
        engine.advance_phase(&admin()).unwrap();
        engine.add_proposal(&VoterId::from("x"), "Cats").unwrap();
        engine.add_proposal(&VoterId::from("x"), "Dogs").unwrap();

        assert_eq!(
            engine.remove_proposal(&admin(), RemovalTarget::Last).unwrap(),
            2
        );
        assert_eq!(
            engine.remove_proposal(&admin(), RemovalTarget::Last).unwrap(),
            1
        );
        assert_eq!(
            engine.remove_proposal(&admin(), RemovalTarget::Last),
            Err(ElectionError::InvalidProposalId(0))
        );
    }

    #[test]
    fn test_double_vote_increments_count_exactly_once() {
        let mut engine = engine_at_voting_open();
        let x = VoterId::from("x");
        engine.cast_vote(&x, 2).unwrap();
        assert_eq!(
            engine.cast_vote(&x, 1),
            Err(ElectionError::AlreadyVoted(x.clone()))
        );

        let counts: Vec<u32> = engine.proposals().map(|(_, p)| p.vote_count).collect();
        assert_eq!(counts, vec![0, 1]);
    }

    #[test]
    fn test_out_of_range_vote_fails_regardless_of_phase() {
        let mut engine = engine();
        // Wrong phase, unregistered caller, id 0: the range check wins.
        assert_eq!(
            engine.cast_vote(&VoterId::from("x"), 0),
            Err(ElectionError::InvalidProposalId(0))
        );

        let mut engine = engine_at_voting_open();
        assert_eq!(
            engine.cast_vote(&VoterId::from("x"), 99),
            Err(ElectionError::InvalidProposalId(99))
        );
    }

    #[test]
    fn test_vote_for_removed_proposal_is_a_hard_error() {
        let mut engine = engine();
        engine.register_voter(&admin(), VoterId::from("x")).unwrap();
        engine.advance_phase(&admin()).unwrap();
        engine.add_proposal(&VoterId::from("x"), "Cats").unwrap();
        engine.add_proposal(&VoterId::from("x"), "Dogs").unwrap();
        engine.remove_proposal(&admin(), RemovalTarget::Id(1)).unwrap();
        engine.advance_phase(&admin()).unwrap();
        engine.advance_phase(&admin()).unwrap();

        assert_eq!(
            engine.cast_vote(&VoterId::from("x"), 1),
            Err(ElectionError::InvalidProposalId(1))
        );
        assert!(!engine
            .proposals()
            .any(|(_, p)| p.vote_count > 0));
    }

    #[test]
    fn test_close_out_announces_winner_and_reaches_tallied() {
        let mut engine = engine_at_voting_open();
        engine.cast_vote(&VoterId::from("x"), 2).unwrap();
        engine.cast_vote(&VoterId::from("y"), 2).unwrap();
        engine.advance_phase(&admin()).unwrap();

        let transition = engine.advance_phase(&admin()).unwrap();
        assert_eq!(transition.to, Phase::Tallied);
        assert!(transition.message.contains("Dogs"));
        assert_eq!(engine.winner().unwrap(), "Dogs");
        assert_eq!(engine.show_vote(&VoterId::from("x")).unwrap(), "Dogs");

        // The workflow is terminal; only reset leaves the tallied phase.
        assert!(matches!(
            engine.advance_phase(&admin()),
            Err(ElectionError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_show_vote_and_winner_refuse_before_tally() {
        let engine = engine_at_voting_open();
        assert!(matches!(
            engine.winner(),
            Err(ElectionError::InvalidPhase { .. })
        ));
        assert!(matches!(
            engine.show_vote(&VoterId::from("x")),
            Err(ElectionError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_show_vote_for_abstainer_fails() {
        let mut engine = engine_at_voting_open();
        engine.cast_vote(&VoterId::from("x"), 1).unwrap();
        engine.advance_phase(&admin()).unwrap();
        engine.advance_phase(&admin()).unwrap();

        assert_eq!(
            engine.show_vote(&VoterId::from("y")),
            Err(ElectionError::HasNotVoted(VoterId::from("y")))
        );
    }

    #[test]
    fn test_reset_clears_everything_and_restarts_ids_at_one() {
        let mut engine = engine_at_voting_open();
        engine.cast_vote(&VoterId::from("x"), 1).unwrap();
        engine.reset_election(&admin()).unwrap();

        assert_eq!(engine.current_phase(), Phase::RegisteringVoters);
        assert_eq!(engine.registered_voter_count(), 0);
        assert_eq!(engine.proposals().count(), 0);

        // A full second cycle starts from scratch.
        engine.register_voter(&admin(), VoterId::from("x")).unwrap();
        engine.advance_phase(&admin()).unwrap();
        assert_eq!(engine.add_proposal(&VoterId::from("x"), "Tea").unwrap(), 1);
    }
}
