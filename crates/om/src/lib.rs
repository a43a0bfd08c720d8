//! Oral Message consensus for the Byzantine generals problem
//!
//! This crate implements the OM(m) protocol over an in-memory population:
//! - Randomised loyalty assignment (`RoleAssigner`)
//! - Majority vote with explicit tie detection (`VoteTally`, `aggregate`)
//! - Deterministic traitor falsification (`policy`)
//! - The recursive relay, unrolled onto an explicit stack (`MessageRelay`)
//! - Parallel fan-out and final decision (`ConsensusCoordinator`)
//!
//! # Architecture
//!
//! A run flows through the following pipeline:
//! 1. `RoleAssigner` builds and shuffles the population
//! 2. `ConsensusCoordinator` starts one relay per participant on worker threads
//! 3. Each `MessageRelay` polls the other participants `budget` levels deep,
//!    stopping early once a strict majority of at least three votes appears
//! 4. The coordinator reduces every participant's belief with a majority vote
//!
//! There is no transport: sending a message is a function call.
//!
//! # Examples
//!
//! ```no_run
//! use byzantine_om::{ConsensusCoordinator, CoordinatorOptions};
//! use byzantine_core::Command;
//!
//! let coordinator = ConsensusCoordinator::new(CoordinatorOptions {
//!     seed: Some(42),
//!     ..CoordinatorOptions::default()
//! });
//! let report = coordinator.run_consensus(7, 2, Command::Attack).unwrap();
//! assert!(report.succeeded);
//! ```

#![warn(missing_docs)]

pub mod coordinator;
pub mod error;
pub mod policy;
pub mod relay;
pub mod roles;
pub mod tally;

// Re-export commonly used types
pub use coordinator::{ConsensusCoordinator, CoordinatorOptions, RunReport};
pub use error::{ConsensusError, Result};
pub use relay::{MessageRelay, RelayOptions, RelayOutcome};
pub use roles::RoleAssigner;
pub use tally::{aggregate, ConsensusResult, VoteTally};
