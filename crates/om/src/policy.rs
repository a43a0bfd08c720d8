//! Traitor falsification policies
//!
//! Traitors lie deterministically, keyed by their identity, so repeated
//! questions about the same command get the same answer. Two separate
//! policies exist:
//!
//! - relaying ([`direct_report`], [`forwarded_command`]): parity-keyed
//!   binary flip, used by the OM(m) relay
//! - stating a personal belief ([`stated_belief`]): unconditional rotation,
//!   never used by the relay

use byzantine_core::{Command, Participant};

/// What `reporter` says it was told when asked directly.
///
/// Loyal participants repeat the command. Traitors with an odd id repeat it
/// too; traitors with an even id report the binary flip.
pub fn direct_report(reporter: &Participant, command: Command) -> Command {
    if reporter.is_loyal() || reporter.id.is_odd() {
        command
    } else {
        command.flip_binary()
    }
}

/// Command `sender` forwards to `recipient` before the recipient relays.
///
/// A loyal sender forwards unchanged. A traitorous sender corrupts what it
/// sends to even-id recipients.
pub fn forwarded_command(sender: &Participant, recipient: &Participant, command: Command) -> Command {
    if sender.is_loyal() || recipient.id.is_odd() {
        command
    } else {
        command.flip_binary()
    }
}

/// Belief a participant states when queried about its own opinion
pub fn stated_belief(participant: &Participant, belief: Command) -> Command {
    if participant.is_loyal() {
        belief
    } else {
        belief.rotate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byzantine_core::Command::{Attack, Retreat, Wait};

    #[test]
    fn test_loyal_passes_through() {
        let loyal = Participant::loyal(4);
        for command in Command::ALL {
            assert_eq!(direct_report(&loyal, command), command);
            assert_eq!(stated_belief(&loyal, command), command);
            assert_eq!(forwarded_command(&loyal, &Participant::traitor(2), command), command);
        }
    }

    #[test]
    fn test_odd_traitor_reports_truthfully() {
        let traitor = Participant::traitor(5);
        for command in Command::ALL {
            assert_eq!(direct_report(&traitor, command), command);
        }
    }

    #[test]
    fn test_even_traitor_flips() {
        let traitor = Participant::traitor(6);
        assert_eq!(direct_report(&traitor, Attack), Retreat);
        assert_eq!(direct_report(&traitor, Retreat), Attack);
        assert_eq!(direct_report(&traitor, Wait), Attack);
    }

    #[test]
    fn test_reports_are_deterministic() {
        let traitor = Participant::traitor(8);
        for command in Command::ALL {
            let first = direct_report(&traitor, command);
            for _ in 0..10 {
                assert_eq!(direct_report(&traitor, command), first);
            }
        }
    }

    #[test]
    fn test_even_traitor_differs_on_binary_pair() {
        let traitor = Participant::traitor(0);
        let loyal = Participant::loyal(0);
        assert!([Attack, Retreat]
            .iter()
            .any(|c| direct_report(&traitor, *c) != direct_report(&loyal, *c)));
    }

    #[test]
    fn test_traitor_sender_corrupts_even_recipients() {
        let sender = Participant::traitor(3);
        assert_eq!(forwarded_command(&sender, &Participant::loyal(2), Attack), Retreat);
        assert_eq!(forwarded_command(&sender, &Participant::loyal(1), Attack), Attack);
        assert_eq!(forwarded_command(&sender, &Participant::traitor(7), Retreat), Retreat);
    }

    #[test]
    fn test_stated_belief_rotates() {
        let traitor = Participant::traitor(1);
        assert_eq!(stated_belief(&traitor, Attack), Retreat);
        assert_eq!(stated_belief(&traitor, Retreat), Wait);
        assert_eq!(stated_belief(&traitor, Wait), Attack);
    }

    #[test]
    fn test_policies_stay_distinct() {
        // Odd traitor: relays faithfully but still misstates its own belief
        let traitor = Participant::traitor(1);
        assert_eq!(direct_report(&traitor, Attack), Attack);
        assert_ne!(stated_belief(&traitor, Attack), Attack);
    }
}
