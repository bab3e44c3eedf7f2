use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use autopark_core::{Money, Plate, SlotId};

use crate::error::{StorageError, StorageResult};

/// One vehicle's stay in the lot.
///
/// Created on a granted entry with only `entry_time` set. At exit the
/// ledger stamps `exit_time` and `fee` and moves it to history, where it
/// stays.
///
/// # Examples
///
/// ```
/// use autopark_core::{Money, Plate, SlotId};
/// use autopark_storage::models::ParkingSession;
/// use chrono::{Duration, Utc};
///
/// let entry = Utc::now();
/// let session = ParkingSession::begin(Plate::new("AB12CDE").unwrap(), SlotId::FIRST, entry);
/// assert!(session.is_active());
///
/// let closed = session.close(entry + Duration::hours(1), Money::from_minor(200));
/// assert!(!closed.is_active());
/// assert_eq!(closed.duration(), Some(Duration::hours(1)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSession {
    pub plate: Plate,
    pub slot_id: SlotId,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub fee: Option<Money>,
}

impl ParkingSession {
    pub fn begin(plate: Plate, slot_id: SlotId, entry_time: DateTime<Utc>) -> Self {
        Self {
            plate,
            slot_id,
            entry_time,
            exit_time: None,
            fee: None,
        }
    }

    /// Stamp exit time and fee.
    #[must_use]
    pub fn close(mut self, exit_time: DateTime<Utc>, fee: Money) -> Self {
        self.exit_time = Some(exit_time);
        self.fee = Some(fee);
        self
    }

    pub fn is_active(&self) -> bool {
        self.exit_time.is_none()
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.exit_time.map(|exit| exit - self.entry_time)
    }
}

/// Row of the `active_sessions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActiveSessionRow {
    pub plate: String,
    pub slot_id: i64,
    pub entry_time: DateTime<Utc>,
}

impl TryFrom<ActiveSessionRow> for ParkingSession {
    type Error = StorageError;

    fn try_from(row: ActiveSessionRow) -> StorageResult<Self> {
        Ok(ParkingSession::begin(
            Plate::new(&row.plate)?,
            slot_from_column(row.slot_id)?,
            row.entry_time,
        ))
    }
}

/// Row of the `parking_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub plate: String,
    pub slot_id: i64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub fee_minor: i64,
}

impl TryFrom<HistoryRow> for ParkingSession {
    type Error = StorageError;

    fn try_from(row: HistoryRow) -> StorageResult<Self> {
        Ok(ParkingSession {
            plate: Plate::new(&row.plate)?,
            slot_id: slot_from_column(row.slot_id)?,
            entry_time: row.entry_time,
            exit_time: Some(row.exit_time),
            fee: Some(Money::from_minor(row.fee_minor)),
        })
    }
}

fn slot_from_column(value: i64) -> StorageResult<SlotId> {
    let id = u32::try_from(value)
        .map_err(|_| StorageError::Validation(format!("slot id out of range: {value}")))?;
    Ok(SlotId::new(id)?)
}
