#![allow(async_fn_in_trait)]

//! Persistence behind the session ledger.
//!
//! A [`LedgerStore`] keeps three collections: the active set keyed by
//! plate, the append-only history log, and the append-only gate event log.
//! It enforces uniqueness (one active session per plate, one per slot) but
//! no business rules; those live in [`crate::ledger::SessionLedger`].

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use autopark_core::Plate;

use crate::error::StorageResult;
use crate::models::{GateEvent, ParkingSession};

/// Storage contract for the ledger.
///
/// Listing methods return newest first; `limit: None` returns everything.
pub trait LedgerStore: Send + Sync {
    async fn find_active(&self, plate: &Plate) -> StorageResult<Option<ParkingSession>>;

    /// Active sessions ordered by slot id.
    async fn list_active(&self) -> StorageResult<Vec<ParkingSession>>;

    async fn count_active(&self) -> StorageResult<usize>;

    /// Add a session to the active set.
    ///
    /// Fails with `StorageError::Conflict` if the plate or the slot is
    /// already held by an active session.
    async fn insert_active(&self, session: &ParkingSession) -> StorageResult<()>;

    /// Remove `closed.plate` from the active set and append `closed` to the
    /// history log, atomically.
    ///
    /// Fails with `StorageError::NotFound` if the plate is not active and
    /// with `StorageError::Validation` if `closed` has no exit time or fee.
    async fn close_session(&self, closed: &ParkingSession) -> StorageResult<()>;

    async fn list_history(&self, limit: Option<usize>) -> StorageResult<Vec<ParkingSession>>;

    /// Append a gate event, returning its id.
    async fn append_event(&self, event: &GateEvent) -> StorageResult<i64>;

    async fn list_events(&self, limit: Option<usize>) -> StorageResult<Vec<GateEvent>>;
}

/// Enum dispatch over the available stores, selected by configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyLedgerStore {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl AnyLedgerStore {
    pub fn backend(&self) -> &'static str {
        match self {
            AnyLedgerStore::Memory(_) => "memory",
            AnyLedgerStore::Sqlite(_) => "sqlite",
        }
    }
}

impl From<MemoryStore> for AnyLedgerStore {
    fn from(store: MemoryStore) -> Self {
        AnyLedgerStore::Memory(store)
    }
}

impl From<SqliteStore> for AnyLedgerStore {
    fn from(store: SqliteStore) -> Self {
        AnyLedgerStore::Sqlite(store)
    }
}

impl LedgerStore for AnyLedgerStore {
    async fn find_active(&self, plate: &Plate) -> StorageResult<Option<ParkingSession>> {
        match self {
            AnyLedgerStore::Memory(store) => store.find_active(plate).await,
            AnyLedgerStore::Sqlite(store) => store.find_active(plate).await,
        }
    }

    async fn list_active(&self) -> StorageResult<Vec<ParkingSession>> {
        match self {
            AnyLedgerStore::Memory(store) => store.list_active().await,
            AnyLedgerStore::Sqlite(store) => store.list_active().await,
        }
    }

    async fn count_active(&self) -> StorageResult<usize> {
        match self {
            AnyLedgerStore::Memory(store) => store.count_active().await,
            AnyLedgerStore::Sqlite(store) => store.count_active().await,
        }
    }

    async fn insert_active(&self, session: &ParkingSession) -> StorageResult<()> {
        match self {
            AnyLedgerStore::Memory(store) => store.insert_active(session).await,
            AnyLedgerStore::Sqlite(store) => store.insert_active(session).await,
        }
    }

    async fn close_session(&self, closed: &ParkingSession) -> StorageResult<()> {
        match self {
            AnyLedgerStore::Memory(store) => store.close_session(closed).await,
            AnyLedgerStore::Sqlite(store) => store.close_session(closed).await,
        }
    }

    async fn list_history(&self, limit: Option<usize>) -> StorageResult<Vec<ParkingSession>> {
        match self {
            AnyLedgerStore::Memory(store) => store.list_history(limit).await,
            AnyLedgerStore::Sqlite(store) => store.list_history(limit).await,
        }
    }

    async fn append_event(&self, event: &GateEvent) -> StorageResult<i64> {
        match self {
            AnyLedgerStore::Memory(store) => store.append_event(event).await,
            AnyLedgerStore::Sqlite(store) => store.append_event(event).await,
        }
    }

    async fn list_events(&self, limit: Option<usize>) -> StorageResult<Vec<GateEvent>> {
        match self {
            AnyLedgerStore::Memory(store) => store.list_events(limit).await,
            AnyLedgerStore::Sqlite(store) => store.list_events(limit).await,
        }
    }
}

/// Exit time and fee of a session being moved to history.
pub(crate) fn closed_fields(
    closed: &ParkingSession,
) -> StorageResult<(chrono::DateTime<chrono::Utc>, autopark_core::Money)> {
    match (closed.exit_time, closed.fee) {
        (Some(exit), Some(fee)) => Ok((exit, fee)),
        _ => Err(crate::error::StorageError::Validation(format!(
            "session for {} has no exit time or fee",
            closed.plate
        ))),
    }
}
