//! Configuration management for simulation runs.
//!
//! Settings can be loaded from TOML (behind the `toml` feature) or built in
//! code from [`SimulationConfig::default_config`]. Nothing is clamped:
//! [`SimulationConfig::validate`] rejects a bad experiment instead of
//! silently running a different one.

use crate::error::{CoreError, Result};
use crate::types::Command;
use serde::{Deserialize, Serialize};
#[cfg(feature = "toml")]
use std::path::Path;

/// Recursion budget used by the reference driver
pub const DEFAULT_BUDGET: u32 = 1;

/// Votes required before a relay may stop early.
///
/// Fixed in the reference protocol; not derived from the classical
/// `2t + 1` quorum.
pub const DEFAULT_EARLY_EXIT_MIN_VOTES: usize = 3;

/// Largest recursion budget accepted unless overridden
pub const DEFAULT_MAX_BUDGET: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub population: PopulationConfig,
    pub protocol: ProtocolConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Number of generals
    pub size: usize,
    /// Explicit traitor count; takes precedence over the ratio
    pub traitor_count: Option<usize>,
    /// Fraction of traitors, truncated against `size`
    pub traitor_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Recursion budget handed to every participant's relay
    pub budget: u32,
    pub early_exit: bool,
    pub early_exit_min_votes: usize,
    pub max_budget: u32,
    /// Per-relay cap on reports and sub-relays issued
    pub max_relay_steps: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub command: Command,
    /// Seed for role assignment; random when unset
    pub seed: Option<u64>,
    /// Worker threads for the fan-out; available parallelism when unset
    pub workers: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: 100_000,
            traitor_count: None,
            traitor_ratio: 1.0 / 3.0,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            early_exit: true,
            early_exit_min_votes: DEFAULT_EARLY_EXIT_MIN_VOTES,
            max_budget: DEFAULT_MAX_BUDGET,
            max_relay_steps: None,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            command: Command::Attack,
            seed: None,
            workers: None,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl PopulationConfig {
    /// Resolve the traitor count for this population.
    ///
    /// An explicit count wins; otherwise `floor(size * ratio)`.
    pub fn traitor_count(&self) -> Result<usize> {
        let traitors = match self.traitor_count {
            Some(count) => count,
            None => traitors_from_ratio(self.size, self.traitor_ratio)?,
        };

        if traitors > self.size {
            return Err(CoreError::TraitorCountOutOfRange {
                traitors,
                population: self.size,
            });
        }
        Ok(traitors)
    }
}

/// Truncate `size * ratio` to a traitor count
pub fn traitors_from_ratio(size: usize, ratio: f64) -> Result<usize> {
    if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
        return Err(CoreError::InvalidTraitorRatio(ratio));
    }
    Ok((size as f64 * ratio).floor() as usize)
}

impl SimulationConfig {
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded simulation config");
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            population: PopulationConfig::default(),
            protocol: ProtocolConfig::default(),
            run: RunConfig::default(),
        }
    }

    /// Resolved traitor count
    pub fn traitor_count(&self) -> Result<usize> {
        self.population.traitor_count()
    }

    /// Reject settings that cannot describe a run
    pub fn validate(&self) -> Result<()> {
        if self.population.size < 1 {
            return Err(CoreError::InvalidPopulation(self.population.size));
        }
        self.population.traitor_count()?;

        if self.protocol.early_exit_min_votes < 1 {
            return Err(CoreError::InvalidConfig(
                "early_exit_min_votes must be at least 1".to_string(),
            ));
        }
        if self.protocol.budget > self.protocol.max_budget {
            return Err(CoreError::InvalidConfig(format!(
                "budget {} exceeds max_budget {}",
                self.protocol.budget, self.protocol.max_budget
            )));
        }
        if self.protocol.max_relay_steps == Some(0) {
            return Err(CoreError::InvalidConfig(
                "max_relay_steps must be positive".to_string(),
            ));
        }
        if self.run.workers == Some(0) {
            return Err(CoreError::InvalidConfig(
                "workers must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
