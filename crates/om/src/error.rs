//! Protocol error types

use byzantine_core::{CoreError, ParticipantId};
use thiserror::Error;

/// Errors raised before or during a consensus run.
///
/// A tie is not an error; it travels as [`crate::ConsensusResult::NoMajority`].
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// Rejected configuration, surfaced before any simulation work
    #[error("Configuration error: {0}")]
    Config(#[from] CoreError),

    /// Relay asked for a sender outside the population
    #[error("Unknown participant: {0}")]
    UnknownParticipant(ParticipantId),

    /// Recursion budget above the configured guard
    #[error("Recursion budget {requested} exceeds limit {max}")]
    BudgetExceeded {
        /// Budget requested
        requested: u32,
        /// Largest budget allowed
        max: u32,
    },

    /// Relay issued more reports and sub-relays than allowed
    #[error("Relay step limit of {limit} exceeded")]
    StepLimitExceeded {
        /// Configured limit
        limit: u64,
    },

    /// A fan-out worker thread panicked
    #[error("Relay worker {0} panicked")]
    WorkerPanicked(usize),
}

/// Result alias for protocol operations
pub type Result<T> = std::result::Result<T, ConsensusError>;
