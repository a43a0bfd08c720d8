//! Majority vote over received commands
//!
//! A tally resolves to the single most-reported command, or to
//! [`ConsensusResult::NoMajority`] when two or more commands share the top
//! count. An empty tally is a three-way tie at zero.

use byzantine_core::Command;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a majority vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsensusResult {
    /// A single command holds the strict maximum
    Decided(Command),
    /// Tie for the maximum, including the empty tally
    NoMajority,
}

impl ConsensusResult {
    /// The decided command, if any
    pub fn command(self) -> Option<Command> {
        match self {
            ConsensusResult::Decided(command) => Some(command),
            ConsensusResult::NoMajority => None,
        }
    }

    /// Check if a command was decided
    pub fn is_decided(self) -> bool {
        matches!(self, ConsensusResult::Decided(_))
    }
}

impl fmt::Display for ConsensusResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusResult::Decided(command) => write!(f, "{}", command),
            ConsensusResult::NoMajority => f.write_str("NO MAJORITY"),
        }
    }
}

/// Per-command vote counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    counts: [usize; 3],
}

impl VoteTally {
    /// Create an empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally a sequence of votes
    pub fn from_votes<'a, I>(votes: I) -> Self
    where
        I: IntoIterator<Item = &'a Command>,
    {
        let mut tally = Self::new();
        for vote in votes {
            tally.record(*vote);
        }
        tally
    }

    /// Add one vote
    pub fn record(&mut self, vote: Command) {
        self.counts[vote.index()] += 1;
    }

    /// Votes received for a command
    pub fn count(&self, command: Command) -> usize {
        self.counts[command.index()]
    }

    /// Total votes received
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Resolve the majority
    pub fn resolve(&self) -> ConsensusResult {
        let max = self.counts.iter().copied().max().unwrap_or(0);
        let mut leaders = Command::ALL
            .into_iter()
            .filter(|command| self.counts[command.index()] == max);

        match (leaders.next(), leaders.next()) {
            (Some(command), None) => ConsensusResult::Decided(command),
            _ => ConsensusResult::NoMajority,
        }
    }
}

/// Majority vote over a slice of commands
pub fn aggregate(votes: &[Command]) -> ConsensusResult {
    VoteTally::from_votes(votes).resolve()
}
