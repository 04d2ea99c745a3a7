//! Training configuration.
//!
//! Resolution order for the base configuration:
//!
//! 1. An explicit path (the CLI's `--config`)
//! 2. `$TOPIC_NMF_CONFIG` (path to a JSON file)
//! 3. Built-in defaults
//!
//! Individual CLI flags are applied on top by the caller.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algo::nmf::{
    NmfOptions, UpdateSchedule, DEFAULT_EPSILON, DEFAULT_ITERATIONS, DEFAULT_RANK,
};
use crate::algo::topics::DEFAULT_TOP_N;
use crate::error::{NmfError, Result};

pub const CONFIG_ENV: &str = "TOPIC_NMF_CONFIG";
pub const DEFAULT_SEED: u64 = 42;

/// Everything a training run needs besides the data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    pub rank: usize,
    pub iterations: usize,
    pub seed: u64,
    pub epsilon: f64,
    pub schedule: UpdateSchedule,
    pub strict: bool,
    /// Terms reported per topic.
    pub top_n: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            rank: DEFAULT_RANK,
            iterations: DEFAULT_ITERATIONS,
            seed: DEFAULT_SEED,
            epsilon: DEFAULT_EPSILON,
            schedule: UpdateSchedule::default(),
            strict: false,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl TrainConfig {
    /// Parse a config from a JSON string. Missing fields take their defaults.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| NmfError::Config(format!("failed to parse config: {e}")))
    }

    /// Load a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| NmfError::Config(format!("failed to read '{}': {e}", path.display())))?;
        Self::parse(&json)
    }

    /// Explicit path, then `$TOPIC_NMF_CONFIG`, then defaults.
    ///
    /// An explicit path that cannot be loaded is an error; the env var is only
    /// consulted when no path is given.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            debug!(path = %path.display(), "loading config");
            return Self::load(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            debug!(%path, env = CONFIG_ENV, "loading config from environment");
            return Self::load(path);
        }
        Ok(Self::default())
    }

    pub fn nmf_options(&self) -> NmfOptions {
        NmfOptions {
            rank: self.rank,
            iterations: self.iterations,
            epsilon: self.epsilon,
            schedule: self.schedule,
            strict: self.strict,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.nmf_options().validate()?;
        if self.top_n == 0 {
            return Err(NmfError::invalid_dimension("top_n must be at least 1"));
        }
        Ok(())
    }
}
