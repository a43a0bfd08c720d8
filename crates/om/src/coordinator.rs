//! Consensus run orchestration
//!
//! One run: assign roles, fan the command out to every participant on a
//! pool of worker threads, collect each participant's belief into a slot
//! array in population order, then reduce the beliefs with a majority vote.
//!
//! Workers share the population read-only through an `Arc`; relays inside a
//! worker run sequentially. The join after the fan-out is the only
//! synchronisation point.

use crate::error::{ConsensusError, Result};
use crate::relay::{MessageRelay, RelayOptions};
use crate::roles::RoleAssigner;
use crate::tally::{ConsensusResult, VoteTally};
use byzantine_core::config::DEFAULT_BUDGET;
use byzantine_core::{Command, CoreError, Population, SimulationConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Coordinator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Budget handed to every participant's relay
    pub budget: u32,
    /// Relay tuning and guards
    pub relay: RelayOptions,
    /// Seed for role assignment; fresh entropy when unset
    pub seed: Option<u64>,
    /// Worker threads; available parallelism when unset
    pub workers: Option<NonZeroUsize>,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            relay: RelayOptions::default(),
            seed: None,
            workers: None,
        }
    }
}

/// Summary of one consensus run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Command the run started from
    pub command: Command,
    /// Group decision
    pub decision: ConsensusResult,
    /// Decision equals the original command
    pub succeeded: bool,
    /// Generals in the run
    pub population_size: usize,
    /// Traitors among them
    pub traitor_count: usize,
    /// Relay budget used
    pub budget: u32,
    /// Decided beliefs per command
    pub beliefs: VoteTally,
    /// Participants whose own relay ended without a majority
    pub abstentions: usize,
    /// Reports and sub-relays issued across all participants
    pub messages: u64,
    /// Wall-clock time of the protocol, excluding role assignment
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl RunReport {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.succeeded {
            0
        } else {
            1
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Runs the full protocol
#[derive(Debug, Clone, Default)]
pub struct ConsensusCoordinator {
    options: CoordinatorOptions,
}

impl ConsensusCoordinator {
    /// Create a coordinator
    pub fn new(options: CoordinatorOptions) -> Self {
        Self { options }
    }

    /// Build options from a validated config
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let workers = match config.run.workers {
            Some(count) => Some(NonZeroUsize::new(count).ok_or_else(|| {
                CoreError::InvalidConfig("workers must be positive".to_string())
            })?),
            None => None,
        };

        Ok(Self::new(CoordinatorOptions {
            budget: config.protocol.budget,
            relay: RelayOptions::from_config(&config.protocol),
            seed: config.run.seed,
            workers,
        }))
    }

    /// Options in effect
    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Run with population, traitors and command taken from a config
    pub fn run(config: &SimulationConfig) -> Result<RunReport> {
        let coordinator = Self::from_config(config)?;
        let traitors = config.traitor_count()?;
        coordinator.run_consensus(config.population.size, traitors, config.run.command)
    }

    /// Assign roles and run the protocol once.
    ///
    /// Configuration problems are returned before any simulation work. A tie
    /// or wrong decision is not an error; check [`RunReport::succeeded`].
    pub fn run_consensus(
        &self,
        population_size: usize,
        traitor_count: usize,
        command: Command,
    ) -> Result<RunReport> {
        if self.options.budget > self.options.relay.max_budget {
            return Err(ConsensusError::BudgetExceeded {
                requested: self.options.budget,
                max: self.options.relay.max_budget,
            });
        }

        let mut rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let population = RoleAssigner::assign(population_size, traitor_count, &mut rng)?;

        tracing::info!(
            population = population_size,
            traitors = traitor_count,
            budget = self.options.budget,
            %command,
            "Starting consensus run"
        );

        let start = Instant::now();
        let beliefs = self.collect_beliefs(Arc::new(population), command)?;

        let mut tally = VoteTally::new();
        let mut abstentions = 0;
        let mut messages = 0u64;
        for (belief, sent) in beliefs {
            messages += sent;
            match belief {
                ConsensusResult::Decided(vote) => tally.record(vote),
                ConsensusResult::NoMajority => abstentions += 1,
            }
        }

        let decision = tally.resolve();
        let elapsed = start.elapsed();
        let succeeded = decision == ConsensusResult::Decided(command);

        if succeeded {
            tracing::info!(%decision, ?elapsed, messages, "Achieved consensus");
        } else {
            tracing::warn!(%decision, %command, abstentions, ?elapsed, "Failed to achieve consensus");
        }

        Ok(RunReport {
            command,
            decision,
            succeeded,
            population_size,
            traitor_count,
            budget: self.options.budget,
            beliefs: tally,
            abstentions,
            messages,
            elapsed,
        })
    }

    fn worker_count(&self, population_size: usize) -> usize {
        let available = self
            .options
            .workers
            .or_else(|| thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get);
        available.min(population_size).max(1)
    }

    /// Fan out one relay per participant; beliefs come back in population order
    fn collect_beliefs(
        &self,
        population: Arc<Population>,
        command: Command,
    ) -> Result<Vec<(ConsensusResult, u64)>> {
        let size = population.len();
        let workers = self.worker_count(size);
        let chunk = size.div_ceil(workers);

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let range = (worker * chunk).min(size)..((worker + 1) * chunk).min(size);
                let population = Arc::clone(&population);
                let options = self.options;
                let handle = thread::spawn(move || relay_range(&population, range, &options, command));
                (worker, handle)
            })
            .collect();

        // Join every worker before reporting a failure
        let joined: Vec<_> = handles
            .into_iter()
            .map(|(worker, handle)| (worker, handle.join()))
            .collect();

        let mut slots: Vec<Option<(ConsensusResult, u64)>> = vec![None; size];
        let mut position = 0;
        let mut first_error = None;
        for (worker, joined) in joined {
            let results = match joined {
                Ok(Ok(results)) => results,
                Ok(Err(err)) => {
                    tracing::debug!(worker, error = %err, "Worker failed");
                    first_error.get_or_insert(err);
                    continue;
                }
                Err(_) => {
                    first_error.get_or_insert(ConsensusError::WorkerPanicked(worker));
                    continue;
                }
            };
            tracing::trace!(worker, participants = results.len(), "Worker finished");
            for result in results {
                slots[position] = Some(result);
                position += 1;
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

/// Relay for every participant at positions in `range`
fn relay_range(
    population: &Population,
    range: Range<usize>,
    options: &CoordinatorOptions,
    command: Command,
) -> Result<Vec<(ConsensusResult, u64)>> {
    let relay = MessageRelay::new(population, options.relay);
    let mut results = Vec::with_capacity(range.len());
    for participant in &population.members()[range] {
        let outcome = relay.relay_counted(participant.id, options.budget, command)?;
        results.push((outcome.result, outcome.messages));
    }
    Ok(results)
}
