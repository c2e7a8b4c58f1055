use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use scrutineer::{cli, telemetry};

#[derive(Parser)]
#[command(name = "scrutineer")]
#[command(about = "Single-election voting workflow engine")]
#[command(
    long_about = "Scrutineer runs a single-election voting workflow: an administrator \
                  admits voters, collects proposals, opens and closes a voting session, \
                  and the engine tallies a winner. Elections are scripted as TOML \
                  scenario files; try 'scrutineer demo' for a complete cycle."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a scripted election scenario
    Run {
        /// Path to the scenario TOML file
        scenario: PathBuf,
    },
    /// Run a built-in two-voter election end to end
    Demo,
    /// Show the effective election policy
    Policy,
}

fn main() -> Result<()> {
    telemetry::init_telemetry()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { scenario } => cli::run_command(scenario),
        Commands::Demo => cli::demo_command(),
        Commands::Policy => cli::policy_command(),
    }
}
