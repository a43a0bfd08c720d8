//! OM(m) message relay
//!
//! Answers "what does `sender` report as the commander's order after
//! cross-checking with every other participant `budget` hops deep?"
//!
//! The recursion is unrolled onto an explicit frame stack, so stack depth is
//! `budget + 1` regardless of population size. Each frame walks the
//! population sequentially in its fixed order:
//!
//! - budget 0: every other participant reports the command directly
//!   ([`policy::direct_report`])
//! - budget > 0: every other participant runs its own relay one level
//!   down, on the command as forwarded by the current sender
//!   ([`policy::forwarded_command`])
//!
//! After each opinion a frame re-resolves its tally and, once it holds at
//! least `early_exit_min_votes` votes with a strict leader, stops polling
//! and hands the leader to its parent. A sub-relay that ends in
//! [`ConsensusResult::NoMajority`] is not counted as a vote.
//!
//! Early exit makes the answer depend on population order once the traitor
//! count approaches the `n/3` bound, before it is reached: at 13 generals
//! with 4 traitors a run can settle on a wrong leader that exhaustive
//! polling would outvote. Far below the bound it only saves work.

use crate::error::{ConsensusError, Result};
use crate::policy;
use crate::tally::{ConsensusResult, VoteTally};
use byzantine_core::config::{ProtocolConfig, DEFAULT_EARLY_EXIT_MIN_VOTES, DEFAULT_MAX_BUDGET};
use byzantine_core::{Command, Participant, ParticipantId, Population};

/// Relay tuning and guards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOptions {
    /// Stop polling once a strict leader emerges
    pub early_exit: bool,
    /// Votes required before early exit may trigger
    pub early_exit_min_votes: usize,
    /// Largest budget a relay accepts
    pub max_budget: u32,
    /// Cap on reports and sub-relays issued by one relay call
    pub max_steps: Option<u64>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            early_exit: true,
            early_exit_min_votes: DEFAULT_EARLY_EXIT_MIN_VOTES,
            max_budget: DEFAULT_MAX_BUDGET,
            max_steps: None,
        }
    }
}

impl RelayOptions {
    /// Options taken from the protocol section of a config
    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self {
            early_exit: config.early_exit,
            early_exit_min_votes: config.early_exit_min_votes,
            max_budget: config.max_budget,
            max_steps: config.max_relay_steps,
        }
    }

    /// Same options with early exit disabled
    pub fn exhaustive(self) -> Self {
        Self {
            early_exit: false,
            ..self
        }
    }
}

/// Result of one relay plus the work it took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOutcome {
    /// What the sender ends up reporting
    pub result: ConsensusResult,
    /// Direct reports and sub-relays issued
    pub messages: u64,
}

/// One pending relay level
#[derive(Debug)]
struct Frame {
    sender: Participant,
    budget: u32,
    command: Command,
    cursor: usize,
    tally: VoteTally,
}

impl Frame {
    fn new(sender: Participant, budget: u32, command: Command) -> Self {
        Self {
            sender,
            budget,
            command,
            cursor: 0,
            tally: VoteTally::new(),
        }
    }

    /// Next participant to consult, skipping the sender itself
    fn next_peer(&mut self, population: &Population) -> Option<Participant> {
        while let Some(peer) = population.at(self.cursor) {
            self.cursor += 1;
            if peer.id != self.sender.id {
                return Some(*peer);
            }
        }
        None
    }

    /// Count an opinion. Returns the decision when the frame may stop early.
    fn accept(&mut self, opinion: ConsensusResult, options: &RelayOptions) -> Option<ConsensusResult> {
        let ConsensusResult::Decided(vote) = opinion else {
            return None;
        };
        self.tally.record(vote);

        if options.early_exit && self.tally.total() >= options.early_exit_min_votes {
            let current = self.tally.resolve();
            if current.is_decided() {
                return Some(current);
            }
        }
        None
    }
}

/// OM(m) relay over a fixed population
#[derive(Debug, Clone, Copy)]
pub struct MessageRelay<'a> {
    population: &'a Population,
    options: RelayOptions,
}

impl<'a> MessageRelay<'a> {
    /// Create a relay over a population
    pub fn new(population: &'a Population, options: RelayOptions) -> Self {
        Self {
            population,
            options,
        }
    }

    /// Options in effect
    pub fn options(&self) -> &RelayOptions {
        &self.options
    }

    /// What `sender` reports `command` to be after `budget` levels of
    /// cross-checking
    pub fn relay(&self, sender: ParticipantId, budget: u32, command: Command) -> Result<ConsensusResult> {
        Ok(self.relay_counted(sender, budget, command)?.result)
    }

    /// [`relay`](Self::relay), also returning the number of messages issued
    pub fn relay_counted(
        &self,
        sender: ParticipantId,
        budget: u32,
        command: Command,
    ) -> Result<RelayOutcome> {
        if budget > self.options.max_budget {
            tracing::warn!(budget, max = self.options.max_budget, "Relay budget over limit");
            return Err(ConsensusError::BudgetExceeded {
                requested: budget,
                max: self.options.max_budget,
            });
        }
        let sender = *self
            .population
            .get(sender)
            .ok_or(ConsensusError::UnknownParticipant(sender))?;

        let mut stack = Vec::with_capacity(budget as usize + 1);
        stack.push(Frame::new(sender, budget, command));

        let mut messages = 0u64;
        let mut returned: Option<ConsensusResult> = None;
        let mut outcome = ConsensusResult::NoMajority;

        while let Some(frame) = stack.last_mut() {
            let mut finished = returned
                .take()
                .and_then(|opinion| frame.accept(opinion, &self.options));

            if finished.is_none() {
                match frame.next_peer(self.population) {
                    None => finished = Some(frame.tally.resolve()),
                    Some(peer) => {
                        messages += 1;
                        if let Some(limit) = self.options.max_steps {
                            if messages > limit {
                                tracing::warn!(sender = %sender.id, limit, "Relay step limit exceeded");
                                return Err(ConsensusError::StepLimitExceeded { limit });
                            }
                        }

                        if frame.budget == 0 {
                            let report = policy::direct_report(&peer, frame.command);
                            returned = Some(ConsensusResult::Decided(report));
                        } else {
                            let forwarded = policy::forwarded_command(&frame.sender, &peer, frame.command);
                            let next_budget = frame.budget - 1;
                            stack.push(Frame::new(peer, next_budget, forwarded));
                        }
                    }
                }
            }

            if let Some(result) = finished {
                stack.pop();
                outcome = result;
                returned = Some(result);
            }
        }

        tracing::trace!(sender = %sender.id, budget, %outcome, messages, "Relay complete");
        Ok(RelayOutcome {
            result: outcome,
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::aggregate;
    use byzantine_core::Command::{Attack, Retreat};

    fn population(members: Vec<Participant>) -> Population {
        Population::new(members).unwrap()
    }

    /// Straightforward recursive rendition used as an oracle
    fn recursive_relay(
        population: &Population,
        sender: &Participant,
        budget: u32,
        command: Command,
        options: &RelayOptions,
    ) -> ConsensusResult {
        let mut votes = Vec::new();
        for peer in population.iter().filter(|p| p.id != sender.id) {
            let opinion = if budget == 0 {
                ConsensusResult::Decided(policy::direct_report(peer, command))
            } else {
                let forwarded = policy::forwarded_command(sender, peer, command);
                recursive_relay(population, peer, budget - 1, forwarded, options)
            };

            if let ConsensusResult::Decided(vote) = opinion {
                votes.push(vote);
                let current = aggregate(&votes);
                if options.early_exit && current.is_decided() && votes.len() >= options.early_exit_min_votes {
                    return current;
                }
            }
        }
        aggregate(&votes)
    }

    #[test]
    fn test_all_loyal_base_case() {
        let population = population((0..5).map(Participant::loyal).collect());
        let relay = MessageRelay::new(&population, RelayOptions::default());

        let outcome = relay.relay_counted(ParticipantId(0), 0, Attack).unwrap();
        assert_eq!(outcome.result, ConsensusResult::Decided(Attack));
        // Early exit after three agreeing reports
        assert_eq!(outcome.messages, 3);
    }

    #[test]
    fn test_exhaustive_polls_everyone() {
        let population = population((0..5).map(Participant::loyal).collect());
        let relay = MessageRelay::new(&population, RelayOptions::default().exhaustive());
        assert!(!relay.options().early_exit);
        assert_eq!(relay.options().max_budget, DEFAULT_MAX_BUDGET);

        let outcome = relay.relay_counted(ParticipantId(2), 0, Retreat).unwrap();
        assert_eq!(outcome.result, ConsensusResult::Decided(Retreat));
        assert_eq!(outcome.messages, 4);
    }

    #[test]
    fn test_base_case_even_traitors_can_sway_early_votes() {
        // Even traitors first: the first three reports are two flips and one truth
        let population = population(vec![
            Participant::loyal(1),
            Participant::traitor(2),
            Participant::traitor(4),
            Participant::loyal(3),
            Participant::loyal(5),
            Participant::loyal(7),
        ]);

        let early = MessageRelay::new(&population, RelayOptions::default());
        assert_eq!(
            early.relay(ParticipantId(1), 0, Attack).unwrap(),
            ConsensusResult::Decided(Retreat)
        );

        let exhaustive = MessageRelay::new(&population, RelayOptions::default().exhaustive());
        assert_eq!(
            exhaustive.relay(ParticipantId(1), 0, Attack).unwrap(),
            ConsensusResult::Decided(Attack)
        );
    }

    #[test]
    fn test_odd_traitors_are_harmless_in_base_case() {
        let population = population(vec![
            Participant::traitor(1),
            Participant::traitor(3),
            Participant::loyal(0),
            Participant::loyal(2),
        ]);
        let relay = MessageRelay::new(&population, RelayOptions::default());
        assert_eq!(
            relay.relay(ParticipantId(0), 0, Attack).unwrap(),
            ConsensusResult::Decided(Attack)
        );
    }

    #[test]
    fn test_tie_without_early_exit() {
        // Sender 0 hears one truth and one flip: 1-1 tie
        let population = population(vec![
            Participant::loyal(0),
            Participant::loyal(1),
            Participant::traitor(2),
        ]);
        let relay = MessageRelay::new(&population, RelayOptions::default());
        assert_eq!(
            relay.relay(ParticipantId(0), 0, Attack).unwrap(),
            ConsensusResult::NoMajority
        );
    }

    #[test]
    fn test_single_participant_has_no_evidence() {
        let population = population(vec![Participant::loyal(0)]);
        let relay = MessageRelay::new(&population, RelayOptions::default());
        let outcome = relay.relay_counted(ParticipantId(0), 1, Attack).unwrap();
        assert_eq!(outcome.result, ConsensusResult::NoMajority);
        assert_eq!(outcome.messages, 0);
    }

    #[test]
    fn test_traitor_sender_corrupts_forwarding() {
        // Traitor 3 forwards RETREAT to every even peer; with all peers even
        // and loyal, their sub-relays all come back RETREAT
        let population = population(vec![
            Participant::traitor(3),
            Participant::loyal(0),
            Participant::loyal(2),
            Participant::loyal(4),
            Participant::loyal(6),
        ]);
        let relay = MessageRelay::new(&population, RelayOptions::default());
        assert_eq!(
            relay.relay(ParticipantId(3), 1, Attack).unwrap(),
            ConsensusResult::Decided(Retreat)
        );

        // A loyal sender over the same population relays the truth
        assert_eq!(
            relay.relay(ParticipantId(0), 1, Attack).unwrap(),
            ConsensusResult::Decided(Attack)
        );
    }

    #[test]
    fn test_matches_recursive_oracle() {
        use crate::roles::RoleAssigner;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let population = RoleAssigner::assign(9, 4, &mut rng).unwrap();
            for options in [RelayOptions::default(), RelayOptions::default().exhaustive()] {
                let relay = MessageRelay::new(&population, options);
                for budget in 0..=2 {
                    for sender in population.iter() {
                        for command in Command::ALL {
                            let expected = recursive_relay(&population, sender, budget, command, &options);
                            let actual = relay.relay(sender.id, budget, command).unwrap();
                            assert_eq!(actual, expected, "seed {} budget {} sender {}", seed, budget, sender.id);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_unknown_sender_rejected() {
        let population = population(vec![Participant::loyal(0), Participant::loyal(1)]);
        let relay = MessageRelay::new(&population, RelayOptions::default());
        assert!(matches!(
            relay.relay(ParticipantId(9), 0, Attack),
            Err(ConsensusError::UnknownParticipant(ParticipantId(9)))
        ));
    }

    #[test]
    fn test_budget_guard() {
        let population = population(vec![Participant::loyal(0), Participant::loyal(1)]);
        let options = RelayOptions {
            max_budget: 2,
            ..RelayOptions::default()
        };
        let relay = MessageRelay::new(&population, options);
        assert!(matches!(
            relay.relay(ParticipantId(0), 3, Attack),
            Err(ConsensusError::BudgetExceeded { requested: 3, max: 2 })
        ));
    }

    #[test]
    fn test_step_limit() {
        let population = population((0..20).map(Participant::loyal).collect());
        let options = RelayOptions {
            max_steps: Some(10),
            ..RelayOptions::default().exhaustive()
        };
        let relay = MessageRelay::new(&population, options);
        assert!(matches!(
            relay.relay(ParticipantId(0), 1, Attack),
            Err(ConsensusError::StepLimitExceeded { limit: 10 })
        ));
    }
}
