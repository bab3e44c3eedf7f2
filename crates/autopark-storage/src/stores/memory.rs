//! In-process store. Nothing survives a restart.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use autopark_core::Plate;

use super::{LedgerStore, closed_fields};
use crate::error::{StorageError, StorageResult};
use crate::models::{GateEvent, ParkingSession};

#[derive(Debug, Default)]
struct Inner {
    active: BTreeMap<String, ParkingSession>,
    history: Vec<ParkingSession>,
    events: Vec<GateEvent>,
}

/// Map-backed [`LedgerStore`]. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn newest_first<T: Clone>(items: &[T], limit: Option<usize>) -> Vec<T> {
    items
        .iter()
        .rev()
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

impl LedgerStore for MemoryStore {
    async fn find_active(&self, plate: &Plate) -> StorageResult<Option<ParkingSession>> {
        Ok(self.lock().active.get(plate.as_str()).cloned())
    }

    async fn list_active(&self) -> StorageResult<Vec<ParkingSession>> {
        let mut sessions: Vec<ParkingSession> = self.lock().active.values().cloned().collect();
        sessions.sort_by_key(|s| s.slot_id);
        Ok(sessions)
    }

    async fn count_active(&self) -> StorageResult<usize> {
        Ok(self.lock().active.len())
    }

    async fn insert_active(&self, session: &ParkingSession) -> StorageResult<()> {
        let mut inner = self.lock();
        if inner.active.contains_key(session.plate.as_str()) {
            return Err(StorageError::Conflict(format!(
                "plate {} already active",
                session.plate
            )));
        }
        if inner.active.values().any(|s| s.slot_id == session.slot_id) {
            return Err(StorageError::Conflict(format!(
                "slot {} already taken",
                session.slot_id
            )));
        }
        inner
            .active
            .insert(session.plate.as_str().to_string(), session.clone());
        Ok(())
    }

    async fn close_session(&self, closed: &ParkingSession) -> StorageResult<()> {
        closed_fields(closed)?;
        let mut inner = self.lock();
        if inner.active.remove(closed.plate.as_str()).is_none() {
            return Err(StorageError::not_found(
                "ParkingSession",
                "plate",
                closed.plate.as_str(),
            ));
        }
        inner.history.push(closed.clone());
        Ok(())
    }

    async fn list_history(&self, limit: Option<usize>) -> StorageResult<Vec<ParkingSession>> {
        Ok(newest_first(&self.lock().history, limit))
    }

    async fn append_event(&self, event: &GateEvent) -> StorageResult<i64> {
        let mut inner = self.lock();
        let id = inner.events.len() as i64 + 1;
        let mut stored = event.clone();
        stored.id = id;
        inner.events.push(stored);
        Ok(id)
    }

    async fn list_events(&self, limit: Option<usize>) -> StorageResult<Vec<GateEvent>> {
        Ok(newest_first(&self.lock().events, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopark_core::{Direction, Money, SlotId};
    use chrono::Utc;

    use crate::models::GateEventKind;

    fn session(plate: &str, slot: u32) -> ParkingSession {
        ParkingSession::begin(Plate::new(plate).unwrap(), SlotId::new(slot).unwrap(), Utc::now())
    }

    #[tokio::test]
    async fn test_conflicts() {
        let store = MemoryStore::new();
        store.insert_active(&session("AB12CDE", 1)).await.unwrap();

        assert!(matches!(
            store.insert_active(&session("AB12CDE", 2)).await,
            Err(StorageError::Conflict(_))
        ));
        assert!(matches!(
            store.insert_active(&session("XY99ZZZ", 1)).await,
            Err(StorageError::Conflict(_))
        ));
        assert_eq!(store.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_close_moves_to_history() {
        let store = MemoryStore::new();
        let open = session("AB12CDE", 1);
        store.insert_active(&open).await.unwrap();

        let closed = open.close(Utc::now(), Money::from_minor(200));
        store.close_session(&closed).await.unwrap();

        assert_eq!(store.count_active().await.unwrap(), 0);
        assert_eq!(store.list_history(None).await.unwrap(), vec![closed.clone()]);
        assert!(matches!(
            store.close_session(&closed).await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unclosed_session_rejected() {
        let store = MemoryStore::new();
        let open = session("AB12CDE", 1);
        store.insert_active(&open).await.unwrap();

        assert!(matches!(
            store.close_session(&open).await,
            Err(StorageError::Validation(_))
        ));
        assert_eq!(store.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_events_get_ids_and_list_newest_first() {
        let store = MemoryStore::new();
        for kind in [GateEventKind::EntryGranted, GateEventKind::ExitGranted] {
            store
                .append_event(&GateEvent::new(kind, Direction::Entry, Utc::now()))
                .await
                .unwrap();
        }

        let events = store.list_events(Some(1)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 2);
        assert_eq!(events[0].kind, GateEventKind::ExitGranted);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.insert_active(&session("AB12CDE", 1)).await.unwrap();
        assert!(
            other
                .find_active(&Plate::new("AB12CDE").unwrap())
                .await
                .unwrap()
                .is_some()
        );
    }
}
