use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::SingleAdmin;
use crate::config::ElectionPolicy;
use crate::election::{RemovalTarget, TracingSink, VoterId, WorkflowEngine};

/// A scripted election: who administers it, which policy applies, and the
/// ordered steps to execute against a fresh engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    pub admin: String,
    #[serde(default)]
    pub policy: ElectionPolicy,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Register { voter: String },
    Advance,
    Propose { voter: String, description: String },
    /// Omitting `id` pops the most recently added proposal.
    Remove { id: Option<u32> },
    Vote { voter: String, proposal: u32 },
    ShowVote { voter: String },
    Winner,
    Reset,
}

impl Scenario {
    /// Load a scenario from TOML, or JSON when the file ends in `.json`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario file {}", path.display()))?;
        let scenario: Scenario = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&raw).context("parsing scenario JSON")?
        } else {
            toml::from_str(&raw).context("parsing scenario TOML")?
        };
        Ok(scenario)
    }
}

/// Execute every step in order against a fresh engine, printing what a human
/// observer of the election would want to see. The first violated
/// precondition aborts the run.
pub fn run(scenario: &Scenario) -> Result<()> {
    let admin = VoterId::from(scenario.admin.as_str());
    let mut engine = WorkflowEngine::new(Box::new(SingleAdmin::new(admin.clone())))
        .with_policy(scenario.policy.clone())
        .with_event_sink(Box::new(TracingSink));

    let span = crate::telemetry::cycle_span(engine.cycle_id());
    let _guard = span.enter();
    info!(steps = scenario.steps.len(), "scenario started");

    for (index, step) in scenario.steps.iter().enumerate() {
        execute_step(&mut engine, &admin, step)
            .with_context(|| format!("step {} ({step:?}) failed", index + 1))?;
    }

    info!(phase = %engine.current_phase(), "scenario finished");
    Ok(())
}

fn execute_step(engine: &mut WorkflowEngine, admin: &VoterId, step: &Step) -> Result<()> {
    match step {
        Step::Register { voter } => {
            engine.register_voter(admin, VoterId::from(voter.as_str()))?;
            println!("registered voter {voter}");
        }
        Step::Advance => {
            let transition = engine.advance_phase(admin)?;
            println!("{}", transition.message);
        }
        Step::Propose { voter, description } => {
            let id = engine.add_proposal(&VoterId::from(voter.as_str()), description)?;
            println!("proposal {id}: {description}");
        }
        Step::Remove { id } => {
            let target = match id {
                Some(id) => RemovalTarget::Id(*id),
                None => RemovalTarget::Last,
            };
            let removed = engine.remove_proposal(admin, target)?;
            println!("removed proposal {removed}");
        }
        Step::Vote { voter, proposal } => {
            engine.cast_vote(&VoterId::from(voter.as_str()), *proposal)?;
            println!("{voter} voted for proposal {proposal}");
        }
        Step::ShowVote { voter } => {
            let description = engine.show_vote(&VoterId::from(voter.as_str()))?;
            println!("{voter} voted for: {description}");
        }
        Step::Winner => {
            let winner = engine.winner()?;
            println!("winner: {winner}");
        }
        Step::Reset => {
            engine.reset_election(admin)?;
            println!("election reset");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_toml_parses_tagged_steps() {
        let scenario: Scenario = toml::from_str(
            r#"
            admin = "alice"

            [policy]
            require_unique_winner = false

            [[steps]]
            action = "register"
            voter = "bob"

            [[steps]]
            action = "advance"

            [[steps]]
            action = "propose"
            voter = "bob"
            description = "Cats"

            [[steps]]
            action = "remove"

            [[steps]]
            action = "vote"
            voter = "bob"
            proposal = 1
            "#,
        )
        .unwrap();

        assert_eq!(scenario.admin, "alice");
        assert!(!scenario.policy.require_unique_winner);
        assert_eq!(scenario.steps.len(), 5);
        assert!(matches!(scenario.steps[3], Step::Remove { id: None }));
    }

    #[test]
    fn test_full_scripted_cycle_runs_to_completion() {
        let scenario: Scenario = toml::from_str(
            r#"
            admin = "alice"
            steps = [
                { action = "register", voter = "x" },
                { action = "register", voter = "y" },
                { action = "advance" },
                { action = "propose", voter = "x", description = "Cats" },
                { action = "propose", voter = "y", description = "Dogs" },
                { action = "advance" },
                { action = "advance" },
                { action = "vote", voter = "x", proposal = 2 },
                { action = "vote", voter = "y", proposal = 2 },
                { action = "advance" },
                { action = "advance" },
                { action = "winner" },
                { action = "show_vote", voter = "x" },
                { action = "reset" },
            ]
            "#,
        )
        .unwrap();

        run(&scenario).unwrap();
    }

    #[test]
    fn test_guard_failure_aborts_with_step_context() {
        let scenario: Scenario = toml::from_str(
            r#"
            admin = "alice"
            steps = [{ action = "advance" }]
            "#,
        )
        .unwrap();

        let err = run(&scenario).unwrap_err();
        assert!(format!("{err:#}").contains("step 1"));
    }
}
