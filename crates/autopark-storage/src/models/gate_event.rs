use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use autopark_core::{Direction, Plate};

use crate::error::{StorageError, StorageResult};

/// Outcome recorded for one plate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateEventKind {
    EntryGranted,
    EntryRejectedFull,
    DuplicateEntry,
    ExitGranted,
    /// Exit requested by a plate with no active session; gate stayed shut.
    ExitDenied,
    RecognitionFailed,
    /// The ledger was updated but a gate command could not be delivered.
    GateFault,
}

impl GateEventKind {
    pub const ALL: [GateEventKind; 7] = [
        GateEventKind::EntryGranted,
        GateEventKind::EntryRejectedFull,
        GateEventKind::DuplicateEntry,
        GateEventKind::ExitGranted,
        GateEventKind::ExitDenied,
        GateEventKind::RecognitionFailed,
        GateEventKind::GateFault,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateEventKind::EntryGranted => "entry_granted",
            GateEventKind::EntryRejectedFull => "entry_rejected_full",
            GateEventKind::DuplicateEntry => "duplicate_entry",
            GateEventKind::ExitGranted => "exit_granted",
            GateEventKind::ExitDenied => "exit_denied",
            GateEventKind::RecognitionFailed => "recognition_failed",
            GateEventKind::GateFault => "gate_fault",
        }
    }
}

impl fmt::Display for GateEventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateEventKind {
    type Err = StorageError;

    fn from_str(s: &str) -> StorageResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StorageError::Validation(format!("unknown gate event kind: {s}")))
    }
}

/// Audit log entry for a gate decision.
///
/// `id` is assigned by the store; events built in memory carry `0`.
///
/// ```
/// use autopark_core::{Direction, Plate};
/// use autopark_storage::models::{GateEvent, GateEventKind};
/// use chrono::Utc;
///
/// let plate = Plate::new("XY99ZZZ").unwrap();
/// let event = GateEvent::new(GateEventKind::EntryRejectedFull, Direction::Entry, Utc::now())
///     .with_plate(&plate)
///     .with_detail("lot full");
/// assert_eq!(event.plate.as_deref(), Some("XY99ZZZ"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateEvent {
    pub id: i64,
    pub plate: Option<String>,
    pub direction: Direction,
    pub kind: GateEventKind,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl GateEvent {
    pub fn new(kind: GateEventKind, direction: Direction, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            plate: None,
            direction,
            kind,
            detail: None,
            timestamp,
        }
    }

    #[must_use]
    pub fn with_plate(mut self, plate: &Plate) -> Self {
        self.plate = Some(plate.as_str().to_string());
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Row of the `gate_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GateEventRow {
    pub id: i64,
    pub plate: Option<String>,
    pub direction: String,
    pub kind: String,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<GateEventRow> for GateEvent {
    type Error = StorageError;

    fn try_from(row: GateEventRow) -> StorageResult<Self> {
        Ok(GateEvent {
            id: row.id,
            plate: row.plate,
            direction: row.direction.parse()?,
            kind: row.kind.parse()?,
            detail: row.detail,
            timestamp: row.timestamp,
        })
    }
}
