//! Active and historical parking sessions.
//!
//! [`SessionLedger`] holds the business rules on top of a [`LedgerStore`]:
//! one active session per plate, one per slot, and fee computation at exit.
//! It does no locking of its own; callers that check and then write (the
//! entry workflow) must serialize access.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use autopark_core::{Money, Plate, SlotId};

use crate::error::StorageError;
use crate::fee::Tariff;
use crate::models::{GateEvent, ParkingSession};
use crate::stores::LedgerStore;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("plate {plate} already has an active session")]
    DuplicateActiveSession { plate: Plate },

    #[error("slot {slot} is held by another active session")]
    SlotTaken { slot: SlotId },

    #[error("no active session for plate {plate}")]
    NoActiveSession { plate: Plate },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Session bookkeeping over a store.
///
/// # Examples
///
/// ```
/// use autopark_core::{Money, Plate, SlotId};
/// use autopark_storage::{MemoryStore, SessionLedger, Tariff};
/// use chrono::{Duration, Utc};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tariff = Tariff::new(std::time::Duration::from_secs(3600), "2.00".parse()?)?;
/// let ledger = SessionLedger::new(MemoryStore::new(), tariff);
///
/// let plate = Plate::new("AB12CDE")?;
/// let t0 = Utc::now();
/// ledger.begin_session(&plate, SlotId::FIRST, t0).await?;
/// let (_session, fee) = ledger.end_session(&plate, t0 + Duration::hours(1)).await?;
/// assert_eq!(fee, Money::from_minor(200));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionLedger<S> {
    store: S,
    tariff: Tariff,
}

impl<S: LedgerStore> SessionLedger<S> {
    pub fn new(store: S, tariff: Tariff) -> Self {
        Self { store, tariff }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tariff(&self) -> &Tariff {
        &self.tariff
    }

    /// Open a session for `plate` in `slot_id`.
    pub async fn begin_session(
        &self,
        plate: &Plate,
        slot_id: SlotId,
        now: DateTime<Utc>,
    ) -> LedgerResult<ParkingSession> {
        if self.store.find_active(plate).await?.is_some() {
            return Err(LedgerError::DuplicateActiveSession {
                plate: plate.clone(),
            });
        }
        if self
            .store
            .list_active()
            .await?
            .iter()
            .any(|s| s.slot_id == slot_id)
        {
            return Err(LedgerError::SlotTaken { slot: slot_id });
        }

        let session = ParkingSession::begin(plate.clone(), slot_id, now);
        self.store.insert_active(&session).await?;

        info!(plate = %plate, slot = %slot_id, "session started");
        Ok(session)
    }

    /// Close the active session for `plate`, returning it with its fee.
    ///
    /// An exit stamped at or before the entry time is moved to one
    /// millisecond after entry.
    pub async fn end_session(
        &self,
        plate: &Plate,
        now: DateTime<Utc>,
    ) -> LedgerResult<(ParkingSession, Money)> {
        let Some(active) = self.store.find_active(plate).await? else {
            return Err(LedgerError::NoActiveSession {
                plate: plate.clone(),
            });
        };

        let exit_time = if now <= active.entry_time {
            warn!(
                plate = %plate,
                entry = %active.entry_time,
                exit = %now,
                "exit time not after entry time, clamping"
            );
            active.entry_time + chrono::Duration::milliseconds(1)
        } else {
            now
        };

        let fee = self.tariff.compute_fee(active.entry_time, exit_time);
        let closed = active.close(exit_time, fee);
        self.store.close_session(&closed).await?;

        info!(plate = %plate, fee = %fee, "session closed");
        Ok((closed, fee))
    }

    pub fn compute_fee(&self, entry: DateTime<Utc>, exit: DateTime<Utc>) -> Money {
        self.tariff.compute_fee(entry, exit)
    }

    pub async fn is_full(&self, capacity: u32) -> LedgerResult<bool> {
        let active = self.store.count_active().await?;
        Ok(active >= capacity as usize)
    }

    pub async fn has_active(&self, plate: &Plate) -> LedgerResult<bool> {
        Ok(self.store.find_active(plate).await?.is_some())
    }

    pub async fn active_count(&self) -> LedgerResult<usize> {
        Ok(self.store.count_active().await?)
    }

    pub async fn active_sessions(&self) -> LedgerResult<Vec<ParkingSession>> {
        Ok(self.store.list_active().await?)
    }

    /// Free slot ids in `1..=capacity`, ascending.
    pub async fn available_slots(&self, capacity: u32) -> LedgerResult<Vec<SlotId>> {
        let taken: Vec<SlotId> = self
            .store
            .list_active()
            .await?
            .into_iter()
            .map(|s| s.slot_id)
            .collect();

        Ok((1..=capacity)
            .filter_map(|id| SlotId::new(id).ok())
            .filter(|slot| !taken.contains(slot))
            .collect())
    }

    /// Completed sessions, most recent first.
    pub async fn history(&self, limit: Option<usize>) -> LedgerResult<Vec<ParkingSession>> {
        Ok(self.store.list_history(limit).await?)
    }

    pub async fn record_event(&self, event: GateEvent) -> LedgerResult<i64> {
        let id = self.store.append_event(&event).await?;
        debug!(id, kind = %event.kind, direction = %event.direction, "gate event recorded");
        Ok(id)
    }

    pub async fn recent_events(&self, limit: Option<usize>) -> LedgerResult<Vec<GateEvent>> {
        Ok(self.store.list_events(limit).await?)
    }
}
