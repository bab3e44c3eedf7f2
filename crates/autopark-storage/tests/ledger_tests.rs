//! Ledger behaviour against both stores, plus persistence across reopen.

use std::time::Duration as StdDuration;

use autopark_core::{Direction, Money, Plate, SlotId};
use autopark_storage::{
    AnyLedgerStore, Database, DatabaseConfig, GateEvent, GateEventKind, LedgerError,
    MemoryStore, SessionLedger, SqliteStore, Tariff, format_duration,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rstest::rstest;

fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap() + Duration::seconds(secs)
}

fn plate(text: &str) -> Plate {
    Plate::new(text).unwrap()
}

fn two_per_hour() -> Tariff {
    Tariff::new(StdDuration::from_secs(3600), Money::from_minor(200)).unwrap()
}

async fn store(backend: &str) -> AnyLedgerStore {
    match backend {
        "memory" => MemoryStore::new().into(),
        _ => SqliteStore::from_database(&Database::in_memory().await.unwrap()).into(),
    }
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test]
async fn test_enter_then_exit_after_one_hour(#[case] backend: &str) {
    let ledger = SessionLedger::new(store(backend).await, two_per_hour());

    ledger.begin_session(&plate("AB12CDE"), SlotId::FIRST, t(0)).await.unwrap();
    assert_eq!(ledger.active_count().await.unwrap(), 1);
    assert!(ledger.is_full(1).await.unwrap());

    let (session, fee) = ledger.end_session(&plate("AB12CDE"), t(3600)).await.unwrap();
    assert_eq!(fee.to_string(), "2.00");
    assert_eq!(format_duration(session.entry_time, session.exit_time.unwrap()), "1 hour");

    assert_eq!(ledger.active_count().await.unwrap(), 0);
    let history = ledger.history(None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].entry_time, t(0));
    assert_eq!(history[0].exit_time, Some(t(3600)));
    assert_eq!(history[0].fee, Some(Money::from_minor(200)));
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test]
async fn test_second_entry_for_same_plate_fails(#[case] backend: &str) {
    let ledger = SessionLedger::new(store(backend).await, two_per_hour());

    ledger.begin_session(&plate("AB12CDE"), SlotId::FIRST, t(0)).await.unwrap();
    let err = ledger
        .begin_session(&plate("AB12CDE"), SlotId::new(2).unwrap(), t(10))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::DuplicateActiveSession { .. }));
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test]
async fn test_reentry_after_exit_is_allowed(#[case] backend: &str) {
    let ledger = SessionLedger::new(store(backend).await, two_per_hour());
    let car = plate("AB12CDE");

    ledger.begin_session(&car, SlotId::FIRST, t(0)).await.unwrap();
    ledger.end_session(&car, t(60)).await.unwrap();
    ledger.begin_session(&car, SlotId::FIRST, t(120)).await.unwrap();

    assert!(ledger.has_active(&car).await.unwrap());
    assert_eq!(ledger.history(None).await.unwrap().len(), 1);
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test]
async fn test_events_are_listed_newest_first(#[case] backend: &str) {
    let ledger = SessionLedger::new(store(backend).await, two_per_hour());

    ledger
        .record_event(
            GateEvent::new(GateEventKind::EntryGranted, Direction::Entry, t(0))
                .with_plate(&plate("AB12CDE")),
        )
        .await
        .unwrap();
    ledger
        .record_event(GateEvent::new(GateEventKind::RecognitionFailed, Direction::Exit, t(5)))
        .await
        .unwrap();

    let events = ledger.recent_events(Some(10)).await.unwrap();
    let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![GateEventKind::RecognitionFailed, GateEventKind::EntryGranted]
    );
    assert_eq!(events[1].plate.as_deref(), Some("AB12CDE"));
    assert!(events[0].plate.is_none());
}

#[tokio::test]
async fn test_history_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db").to_string_lossy().into_owned();

    let stored = {
        let db = Database::open(DatabaseConfig::new(&path)).await.unwrap();
        let ledger = SessionLedger::new(SqliteStore::from_database(&db), two_per_hour());

        ledger.begin_session(&plate("AB12CDE"), SlotId::FIRST, t(0)).await.unwrap();
        let (closed, _) = ledger
            .end_session(&plate("AB12CDE"), t(5400) + Duration::milliseconds(250))
            .await
            .unwrap();
        ledger.begin_session(&plate("XY99ZZZ"), SlotId::FIRST, t(6000)).await.unwrap();
        db.close().await;
        closed
    };

    let db = Database::open(DatabaseConfig::new(&path)).await.unwrap();
    let ledger = SessionLedger::new(SqliteStore::from_database(&db), two_per_hour());

    let history = ledger.history(None).await.unwrap();
    assert_eq!(history, vec![stored.clone()]);
    assert_eq!(stored.fee, Some(Money::from_minor(400)));

    let active = ledger.active_sessions().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].plate.as_str(), "XY99ZZZ");
    assert_eq!(active[0].entry_time, t(6000));

    db.close().await;
}
