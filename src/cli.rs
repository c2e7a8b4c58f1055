use std::path::PathBuf;

use anyhow::Result;

use crate::config::ElectionPolicy;
use crate::scenario::{self, Scenario, Step};

/// Execute a scripted election from a TOML scenario file.
pub fn run_command(path: PathBuf) -> Result<()> {
    let scenario = Scenario::from_file(path)?;
    scenario::run(&scenario)
}

/// Run a built-in two-voter election end to end: register, propose, vote,
/// tally, announce. Useful as a smoke test of a fresh build.
pub fn demo_command() -> Result<()> {
    let scenario = Scenario {
        admin: "admin".to_string(),
        policy: ElectionPolicy::load()?,
        steps: vec![
            Step::Register {
                voter: "x".to_string(),
            },
            Step::Register {
                voter: "y".to_string(),
            },
            Step::Advance,
            Step::Propose {
                voter: "x".to_string(),
                description: "Cats".to_string(),
            },
            Step::Propose {
                voter: "y".to_string(),
                description: "Dogs".to_string(),
            },
            Step::Advance,
            Step::Advance,
            Step::Vote {
                voter: "x".to_string(),
                proposal: 2,
            },
            Step::Vote {
                voter: "y".to_string(),
                proposal: 2,
            },
            Step::Advance,
            Step::Advance,
            Step::Winner,
            Step::ShowVote {
                voter: "x".to_string(),
            },
        ],
    };
    scenario::run(&scenario)
}

/// Print the effective policy (defaults, file, and environment applied).
pub fn policy_command() -> Result<()> {
    let policy = ElectionPolicy::load()?;
    println!("{}", toml::to_string_pretty(&policy)?);
    Ok(())
}
