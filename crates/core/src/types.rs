//! Core types
//!
//! Commands, participants and the population snapshot shared by every
//! stage of a consensus run.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Order relayed between generals.
///
/// Discriminants are the wire indices `0..=2`. RETREAT and ATTACK occupy the
/// two binary-adjacent slots used by the relay flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Fall back
    Retreat = 0,
    /// Advance on the city
    Attack = 1,
    /// Hold position
    Wait = 2,
}

impl Command {
    /// Every command, in index order
    pub const ALL: [Command; 3] = [Command::Retreat, Command::Attack, Command::Wait];

    /// Index of this command in `0..=2`
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a command by index
    pub fn from_index(index: usize) -> Option<Command> {
        Self::ALL.get(index).copied()
    }

    /// Toggle between the two binary-adjacent slots.
    ///
    /// RETREAT and ATTACK swap. WAIT lands on ATTACK, so this flip never
    /// produces WAIT.
    pub fn flip_binary(self) -> Command {
        match self {
            Command::Retreat => Command::Attack,
            Command::Attack => Command::Retreat,
            // (2 + 1) % 2
            Command::Wait => Command::Attack,
        }
    }

    /// Rotate to the next command: ATTACK -> RETREAT -> WAIT -> ATTACK
    pub fn rotate(self) -> Command {
        match self {
            Command::Attack => Command::Retreat,
            Command::Retreat => Command::Wait,
            Command::Wait => Command::Attack,
        }
    }

    /// Upper-case name
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Retreat => "RETREAT",
            Command::Attack => "ATTACK",
            Command::Wait => "WAIT",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RETREAT" => Ok(Command::Retreat),
            "ATTACK" => Ok(Command::Attack),
            "WAIT" => Ok(Command::Wait),
            other => Err(CoreError::UnknownCommand(other.to_string())),
        }
    }
}

/// Stable participant identifier, unique within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

impl ParticipantId {
    /// Parity of the identifier, used by the traitor falsification policy
    pub fn is_odd(self) -> bool {
        self.0 % 2 == 1
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "general-{}", self.0)
    }
}

/// Loyalty of a participant. Known only to the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Loyalty {
    /// Relays truthfully
    Loyal,
    /// Relays falsely according to a fixed policy
    Traitor,
}

/// A general taking part in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identifier
    pub id: ParticipantId,
    /// Loyalty, fixed at setup
    pub loyalty: Loyalty,
}

impl Participant {
    /// Create a loyal participant
    pub fn loyal(id: u64) -> Self {
        Self {
            id: ParticipantId(id),
            loyalty: Loyalty::Loyal,
        }
    }

    /// Create a traitorous participant
    pub fn traitor(id: u64) -> Self {
        Self {
            id: ParticipantId(id),
            loyalty: Loyalty::Traitor,
        }
    }

    /// Check if the participant is loyal
    pub fn is_loyal(&self) -> bool {
        matches!(self.loyalty, Loyalty::Loyal)
    }

    /// Check if the participant is a traitor
    pub fn is_traitor(&self) -> bool {
        matches!(self.loyalty, Loyalty::Traitor)
    }
}

/// Immutable snapshot of every participant in one run.
///
/// Iteration order is the order the population was built in (shuffled by
/// the role assigner). Identifiers are pairwise distinct.
#[derive(Debug, Clone)]
pub struct Population {
    members: Vec<Participant>,
    positions: HashMap<ParticipantId, usize>,
}

impl Population {
    /// Build a population, rejecting empty sets and duplicate identifiers
    pub fn new(members: Vec<Participant>) -> Result<Self> {
        if members.is_empty() {
            return Err(CoreError::InvalidPopulation(0));
        }

        let mut positions = HashMap::with_capacity(members.len());
        for (position, member) in members.iter().enumerate() {
            if positions.insert(member.id, position).is_some() {
                return Err(CoreError::DuplicateParticipant(member.id.0));
            }
        }

        Ok(Self { members, positions })
    }

    /// Number of participants
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a validated population
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of traitors
    pub fn traitor_count(&self) -> usize {
        self.members.iter().filter(|p| p.is_traitor()).count()
    }

    /// Participants in iteration order
    pub fn members(&self) -> &[Participant] {
        &self.members
    }

    /// Participant at a position
    pub fn at(&self, position: usize) -> Option<&Participant> {
        self.members.get(position)
    }

    /// Look up a participant by identifier
    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.positions.get(&id).map(|&position| &self.members[position])
    }

    /// Iterate over participants
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.members.iter()
    }
}
