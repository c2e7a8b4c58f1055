use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Behavior knobs for one election cycle. The defaults form the strict
/// policy set; every field is overridable per scenario or via environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ElectionPolicy {
    /// Abort close-out with a tie error when more than one proposal reaches
    /// the maximum vote count. When false the first (lowest-id) maximum is
    /// accepted as sole winner.
    pub require_unique_winner: bool,
    /// Refuse to close the voting session before at least one ballot is in.
    pub require_vote_before_close: bool,
    /// Restrict reset to the tallied phase. When false the administrator may
    /// abandon a cycle at any point.
    pub reset_requires_tally: bool,
    /// Reject blank or whitespace-only proposal descriptions.
    pub reject_empty_descriptions: bool,
}

impl Default for ElectionPolicy {
    fn default() -> Self {
        Self {
            require_unique_winner: true,
            require_vote_before_close: true,
            reset_requires_tally: false,
            reject_empty_descriptions: true,
        }
    }
}

impl ElectionPolicy {
    /// Load the policy with precedence:
    /// 1. Default values
    /// 2. `scrutineer.toml` in the working directory, if present
    /// 3. Environment variables prefixed with `SCRUTINEER_`
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("scrutineer.toml").exists() {
            builder = builder.add_source(File::with_name("scrutineer"));
        }

        builder =
            builder.add_source(Environment::with_prefix("SCRUTINEER").try_parsing(true));

        let config = builder.build()?;
        let policy = config.try_deserialize()?;
        Ok(policy)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }
}
