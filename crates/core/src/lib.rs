//! Core functionality for the Byzantine generals simulator.
//!
//! This crate provides the shared data model (commands, participants and
//! populations), run configuration, error types and logging setup used by
//! the protocol crate and its driver.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{PopulationConfig, ProtocolConfig, RunConfig, SimulationConfig};
pub use error::{CoreError, Result};
pub use types::{Command, Loyalty, Participant, ParticipantId, Population};
