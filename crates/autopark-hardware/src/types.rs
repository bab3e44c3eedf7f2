//! Link-side view of the hardware.
//!
//! The microcontroller owns the truth about the slot sensor and the gate
//! servos. The host keeps a mirror of it in [`LinkState`]: the slot half
//! changes only when a notification arrives, the gate half only when a
//! command has been accepted by the channel.

use autopark_core::Direction;
use autopark_protocol::{GateCommand, Notification};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last slot occupancy reported by the microcontroller.
///
/// Before the first notification the slot counts as free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotState {
    pub occupied: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Believed gate positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateState {
    pub entry_open: bool,
    pub exit_open: bool,
}

impl GateState {
    pub fn is_open(&self, direction: Direction) -> bool {
        match direction {
            Direction::Entry => self.entry_open,
            Direction::Exit => self.exit_open,
        }
    }
}

/// Combined hardware mirror owned by a gate link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkState {
    slot: SlotState,
    gates: GateState,
}

impl LinkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self) -> SlotState {
        self.slot
    }

    pub fn gates(&self) -> GateState {
        self.gates
    }

    pub fn apply_notification(&mut self, notification: Notification, at: DateTime<Utc>) {
        self.slot = SlotState {
            occupied: notification.occupied(),
            updated_at: Some(at),
        };
    }

    /// Record a command the channel accepted. Buzzer commands leave the
    /// gate state untouched.
    pub fn apply_command(&mut self, command: GateCommand) {
        match command {
            GateCommand::OpenEntry => self.gates.entry_open = true,
            GateCommand::CloseEntry => self.gates.entry_open = false,
            GateCommand::OpenExit => self.gates.exit_open = true,
            GateCommand::CloseExit => self.gates.exit_open = false,
            GateCommand::BuzzerOn | GateCommand::BuzzerOff => {}
        }
    }
}

/// Descriptive information about a link, for logs and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    /// Link name, usually the serial port path.
    pub name: String,

    /// Transport description (e.g. "serial 115200 baud").
    pub transport: String,
}

impl LinkInfo {
    pub fn new(name: impl Into<String>, transport: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: transport.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_slot_starts_free() {
        let state = LinkState::new();
        assert!(!state.slot().occupied);
        assert!(state.slot().updated_at.is_none());
    }

    #[test]
    fn test_apply_notification() {
        let mut state = LinkState::new();
        let at = Utc::now();

        state.apply_notification(Notification::SlotOccupied, at);
        assert!(state.slot().occupied);
        assert_eq!(state.slot().updated_at, Some(at));

        state.apply_notification(Notification::SlotFree, at);
        assert!(!state.slot().occupied);
    }

    #[rstest]
    #[case(GateCommand::OpenEntry, true, false)]
    #[case(GateCommand::OpenExit, false, true)]
    #[case(GateCommand::BuzzerOn, false, false)]
    fn test_apply_command(
        #[case] command: GateCommand,
        #[case] entry_open: bool,
        #[case] exit_open: bool,
    ) {
        let mut state = LinkState::new();
        state.apply_command(command);
        assert_eq!(state.gates().entry_open, entry_open);
        assert_eq!(state.gates().exit_open, exit_open);
    }

    #[test]
    fn test_close_after_open() {
        let mut state = LinkState::new();
        state.apply_command(GateCommand::OpenEntry);
        assert!(state.gates().is_open(Direction::Entry));
        state.apply_command(GateCommand::CloseEntry);
        assert!(!state.gates().is_open(Direction::Entry));
    }

    #[test]
    fn test_gate_commands_leave_slot_alone() {
        let mut state = LinkState::new();
        state.apply_notification(Notification::SlotOccupied, Utc::now());
        state.apply_command(GateCommand::OpenEntry);
        state.apply_command(GateCommand::CloseEntry);
        assert!(state.slot().occupied);
    }
}
