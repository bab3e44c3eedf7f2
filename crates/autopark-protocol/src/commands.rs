//! Command and notification tokens.

use std::fmt;
use std::str::FromStr;

use autopark_core::Direction;

use crate::ProtocolError;

/// Command sent from the host to the gate microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateCommand {
    OpenEntry,
    CloseEntry,
    OpenExit,
    CloseExit,
    BuzzerOn,
    BuzzerOff,
}

impl GateCommand {
    pub const ALL: [GateCommand; 6] = [
        GateCommand::OpenEntry,
        GateCommand::CloseEntry,
        GateCommand::OpenExit,
        GateCommand::CloseExit,
        GateCommand::BuzzerOn,
        GateCommand::BuzzerOff,
    ];

    /// Wire token, without the line terminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateCommand::OpenEntry => "OPEN_ENTRY_GATE",
            GateCommand::CloseEntry => "CLOSE_ENTRY_GATE",
            GateCommand::OpenExit => "OPEN_EXIT_GATE",
            GateCommand::CloseExit => "CLOSE_EXIT_GATE",
            GateCommand::BuzzerOn => "BUZZER_ON",
            GateCommand::BuzzerOff => "BUZZER_OFF",
        }
    }

    /// Open command for the given gate.
    pub fn open(direction: Direction) -> Self {
        match direction {
            Direction::Entry => GateCommand::OpenEntry,
            Direction::Exit => GateCommand::OpenExit,
        }
    }

    /// Close command for the given gate.
    pub fn close(direction: Direction) -> Self {
        match direction {
            Direction::Entry => GateCommand::CloseEntry,
            Direction::Exit => GateCommand::CloseExit,
        }
    }

    /// Gate moved by this command; `None` for buzzer commands.
    pub fn gate(&self) -> Option<Direction> {
        match self {
            GateCommand::OpenEntry | GateCommand::CloseEntry => Some(Direction::Entry),
            GateCommand::OpenExit | GateCommand::CloseExit => Some(Direction::Exit),
            GateCommand::BuzzerOn | GateCommand::BuzzerOff => None,
        }
    }
}

impl fmt::Display for GateCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        GateCommand::ALL
            .into_iter()
            .find(|cmd| cmd.as_str() == token)
            .ok_or_else(|| ProtocolError::unknown_token(token))
    }
}

/// Notification sent from the microcontroller to the host.
///
/// The board sends one per debounced sensor transition and one at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    SlotOccupied,
    SlotFree,
}

impl Notification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Notification::SlotOccupied => "SLOT_OCCUPIED",
            Notification::SlotFree => "SLOT_FREE",
        }
    }

    /// Whether this notification reports the slot as occupied.
    pub fn occupied(&self) -> bool {
        matches!(self, Notification::SlotOccupied)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Notification {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "SLOT_OCCUPIED" => Ok(Notification::SlotOccupied),
            "SLOT_FREE" => Ok(Notification::SlotFree),
            other => Err(ProtocolError::unknown_token(other)),
        }
    }
}

/// One decoded inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Notification(Notification),
    /// Well-framed line that is not a known token. Kept for logging.
    Unrecognized(String),
}

impl Inbound {
    /// Classify an already trimmed line.
    pub fn from_line(line: String) -> Self {
        match line.parse::<Notification>() {
            Ok(notification) => Inbound::Notification(notification),
            Err(_) => Inbound::Unrecognized(line),
        }
    }
}
