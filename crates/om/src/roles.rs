//! Randomised loyalty assignment
//!
//! Identifiers `0..size` are created, the last `traitors` of them are marked
//! traitor, and the whole set is shuffled so position carries no loyalty
//! signal.

use byzantine_core::config::traitors_from_ratio;
use byzantine_core::{CoreError, Participant, Population};
use rand::seq::SliceRandom;
use rand::Rng;

/// Builds the population for one run
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAssigner;

impl RoleAssigner {
    /// Assign loyalties and shuffle.
    ///
    /// # Arguments
    /// * `size` - Number of participants, at least 1
    /// * `traitors` - Number of traitors, within `0..=size`
    /// * `rng` - Random source used for the permutation only
    pub fn assign<R: Rng + ?Sized>(
        size: usize,
        traitors: usize,
        rng: &mut R,
    ) -> Result<Population, CoreError> {
        if size < 1 {
            return Err(CoreError::InvalidPopulation(size));
        }
        if traitors > size {
            return Err(CoreError::TraitorCountOutOfRange {
                traitors,
                population: size,
            });
        }

        let loyal = size - traitors;
        let mut members: Vec<Participant> = (0..size as u64)
            .map(|id| {
                if (id as usize) < loyal {
                    Participant::loyal(id)
                } else {
                    Participant::traitor(id)
                }
            })
            .collect();

        members.shuffle(rng);
        tracing::debug!(size, traitors, "Assigned roles");

        Population::new(members)
    }

    /// Assign with the traitor count taken as `floor(size * ratio)`
    pub fn assign_ratio<R: Rng + ?Sized>(
        size: usize,
        ratio: f64,
        rng: &mut R,
    ) -> Result<Population, CoreError> {
        let traitors = traitors_from_ratio(size, ratio)?;
        Self::assign(size, traitors, rng)
    }
}
