//! Core error types

use thiserror::Error;

/// Core error type for the simulator
#[derive(Debug, Error)]
pub enum CoreError {
    /// Population must hold at least one participant
    #[error("Invalid population size: {0} (must be at least 1)")]
    InvalidPopulation(usize),

    /// Traitor count outside `[0, population]`
    #[error("Traitor count {traitors} out of range for population of {population}")]
    TraitorCountOutOfRange {
        /// Requested traitors
        traitors: usize,
        /// Population size
        population: usize,
    },

    /// Traitor ratio outside `[0, 1]` or not finite
    #[error("Invalid traitor ratio: {0} (must be within 0.0..=1.0)")]
    InvalidTraitorRatio(f64),

    /// Two participants share an identifier
    #[error("Duplicate participant id: {0}")]
    DuplicateParticipant(u64),

    /// Command name not recognised
    #[error("Unknown command: {0} (expected ATTACK, RETREAT or WAIT)")]
    UnknownCommand(String),

    /// Any other invalid setting
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[cfg(feature = "toml")]
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
