//! Inbound plate events and outbound controller events.

use chrono::{DateTime, Utc};
use serde::Serialize;

use autopark_core::{Direction, Money, Plate, SlotId};
use autopark_protocol::GateCommand;

/// A vehicle crossed the entry or exit line; `image` is the plate crop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateEvent {
    pub direction: Direction,
    pub image: Vec<u8>,
    /// Second crop tried when the first one cannot be read.
    pub fallback: Option<Vec<u8>>,
}

impl PlateEvent {
    pub fn new(direction: Direction, image: impl Into<Vec<u8>>) -> Self {
        Self {
            direction,
            image: image.into(),
            fallback: None,
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<Vec<u8>>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Image for recognition attempt `attempt` (1-based).
    pub fn image_for_attempt(&self, attempt: u32) -> &[u8] {
        match (&self.fallback, attempt) {
            (Some(fallback), n) if n > 1 => fallback,
            _ => &self.image,
        }
    }
}

/// Printed for the driver when an exit is granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub plate: Plate,
    pub slot_id: SlotId,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    /// e.g. "2 hours 30 minutes"
    pub duration: String,
    pub fee: Money,
}

/// Something subscribers (console, display) should know about.
///
/// Delivered over a broadcast channel; a slow subscriber loses the oldest
/// events instead of holding up the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    SlotChanged {
        occupied: bool,
        at: DateTime<Utc>,
    },
    EntryGranted {
        plate: Plate,
        slot_id: SlotId,
        at: DateTime<Utc>,
    },
    EntryRejected {
        plate: Plate,
        reason: String,
    },
    DuplicateIgnored {
        plate: Plate,
    },
    Receipt(Receipt),
    /// Needs an operator, e.g. an exit by a plate that never entered.
    Alert {
        gate: Direction,
        plate: Option<Plate>,
        message: String,
    },
    RecognitionFailed {
        gate: Direction,
        reason: String,
    },
    /// A gate command failed after every retry.
    GateFault {
        gate: Direction,
        command: GateCommand,
        plate: Option<Plate>,
        message: String,
    },
}

impl ControllerEvent {
    /// Alerts and gate faults go to the operator at warning level.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ControllerEvent::Alert { .. } | ControllerEvent::GateFault { .. }
        )
    }
}
