//! Entry and exit workflows against a mock board, mock OCR and an
//! in-memory ledger. Time is paused, so settle and buzzer delays are
//! skipped over but still measurable.

mod common;

use std::time::Duration as StdDuration;

use autopark_controller::{ControllerConfig, ControllerEvent, CycleState, GateCycle, Outcome, PlateEvent};
use autopark_core::{Direction, Money};
use autopark_hardware::GateLink;
use autopark_protocol::{GateCommand, Notification};
use autopark_storage::{GateEventKind, LedgerStore};
use chrono::Duration;
use tokio::time::Instant;

use common::{harness, t0};

fn entry_event() -> PlateEvent {
    PlateEvent::new(Direction::Entry, b"entry-crop".to_vec())
}

fn exit_event() -> PlateEvent {
    PlateEvent::new(Direction::Exit, b"exit-crop".to_vec())
}

async fn event_kinds(store: &autopark_storage::MemoryStore) -> Vec<GateEventKind> {
    let mut kinds: Vec<_> = store
        .list_events(None)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    kinds.reverse();
    kinds
}

#[tokio::test(start_paused = true)]
async fn test_entry_then_second_car_finds_lot_full() {
    let h = harness(ControllerConfig::default());
    let mut cycle = GateCycle::new(Direction::Entry);

    h.ocr.push_text("AB12CDE");
    let started = Instant::now();
    let outcome = h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();

    assert!(matches!(outcome, Outcome::EntryGranted { gate_fault: false, .. }));
    assert!(started.elapsed() >= StdDuration::from_secs(5));
    assert_eq!(
        h.board.sent_commands(),
        vec![GateCommand::OpenEntry, GateCommand::CloseEntry]
    );
    assert_eq!(cycle.current_state(), CycleState::Idle);

    h.board.notify(Notification::SlotOccupied);
    h.board.clear_sent();
    h.clock.advance(Duration::seconds(1));
    h.ocr.push_text("XY99ZZZ");

    let started = Instant::now();
    let outcome = h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();

    assert!(matches!(outcome, Outcome::EntryRejected { .. }));
    assert!(started.elapsed() >= StdDuration::from_secs(3));
    assert_eq!(
        h.board.sent_commands(),
        vec![GateCommand::BuzzerOn, GateCommand::BuzzerOff]
    );
    assert!(h.controller.link().slot_state().occupied);

    let ledger = h.controller.ledger().lock().await;
    assert_eq!(ledger.active_count().await.unwrap(), 1);
    drop(ledger);

    assert_eq!(
        event_kinds(&h.store).await,
        vec![GateEventKind::EntryGranted, GateEventKind::EntryRejectedFull]
    );
}

#[tokio::test(start_paused = true)]
async fn test_ledger_fullness_rejects_even_when_sensor_is_free() {
    let h = harness(ControllerConfig::default());
    let mut cycle = GateCycle::new(Direction::Entry);

    h.ocr.push_text("AB12CDE");
    h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();
    h.board.clear_sent();

    h.ocr.push_text("XY99ZZZ");
    let outcome = h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();

    assert!(matches!(outcome, Outcome::EntryRejected { .. }));
    assert!(!h.board.sent_commands().contains(&GateCommand::OpenEntry));
}

#[tokio::test(start_paused = true)]
async fn test_exit_after_one_hour_charges_one_unit() {
    let h = harness(ControllerConfig::default());
    let mut entry = GateCycle::new(Direction::Entry);
    let mut exit = GateCycle::new(Direction::Exit);
    let mut events = h.controller.subscribe();

    h.ocr.push_text("AB12CDE");
    h.controller.handle_event(&mut entry, entry_event()).await.unwrap();
    h.board.clear_sent();

    h.clock.set(t0() + Duration::hours(1));
    h.ocr.push_text("AB12CDE");
    let outcome = h.controller.handle_event(&mut exit, exit_event()).await.unwrap();

    let Outcome::ExitGranted { receipt, gate_fault } = outcome else {
        panic!("expected exit granted, got {outcome:?}");
    };
    assert!(!gate_fault);
    assert_eq!(receipt.fee, Money::from_minor(200));
    assert_eq!(receipt.duration, "1 hour");
    assert_eq!(
        h.board.sent_commands(),
        vec![GateCommand::OpenExit, GateCommand::CloseExit]
    );

    let ledger = h.controller.ledger().lock().await;
    assert_eq!(ledger.active_count().await.unwrap(), 0);
    let history = ledger.history(None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].entry_time, t0());
    assert_eq!(history[0].exit_time, Some(t0() + Duration::hours(1)));
    assert_eq!(history[0].fee, Some(Money::from_minor(200)));
    drop(ledger);

    let mut saw_receipt = false;
    while let Ok(event) = events.try_recv() {
        if let ControllerEvent::Receipt(r) = event {
            assert_eq!(r.fee.to_string(), "2.00");
            saw_receipt = true;
        }
    }
    assert!(saw_receipt);
}

#[tokio::test(start_paused = true)]
async fn test_exit_with_unknown_plate_fails_closed() {
    let h = harness(ControllerConfig::default());
    let mut exit = GateCycle::new(Direction::Exit);
    let mut events = h.controller.subscribe();

    h.ocr.push_text("ZZ00ZZZ");
    let outcome = h.controller.handle_event(&mut exit, exit_event()).await.unwrap();

    assert!(matches!(outcome, Outcome::ExitDenied { .. }));
    assert!(h.board.sent_commands().is_empty());
    assert_eq!(event_kinds(&h.store).await, vec![GateEventKind::ExitDenied]);

    let event = events.try_recv().unwrap();
    assert!(event.is_warning());
    assert!(matches!(event, ControllerEvent::Alert { gate: Direction::Exit, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_entry_is_ignored() {
    let h = harness(ControllerConfig {
        capacity: 3,
        ..ControllerConfig::default()
    });
    let mut cycle = GateCycle::new(Direction::Entry);

    h.ocr.push_text("AB12CDE");
    h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();
    h.board.clear_sent();

    h.ocr.push_text("AB 12 CDE");
    let outcome = h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();

    assert!(matches!(outcome, Outcome::DuplicateIgnored { .. }));
    assert!(h.board.sent_commands().is_empty());
    assert_eq!(h.store.count_active().await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_slot_is_assigned_when_capacity_allows() {
    let h = harness(ControllerConfig {
        capacity: 2,
        ..ControllerConfig::default()
    });
    let mut cycle = GateCycle::new(Direction::Entry);

    h.ocr.push_text("AB12CDE");
    h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();
    h.ocr.push_text("XY99ZZZ");
    let outcome = h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();

    let Outcome::EntryGranted { session, .. } = outcome else {
        panic!("expected entry granted, got {outcome:?}");
    };
    assert_eq!(session.slot_id.as_u32(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_recognition_retry_uses_fallback_image() {
    let h = harness(ControllerConfig::default());
    let mut cycle = GateCycle::new(Direction::Entry);

    h.ocr.push_no_plate();
    h.ocr.push_text("AB12CDE");
    let event = entry_event().with_fallback(b"wide-crop".to_vec());
    let outcome = h.controller.handle_event(&mut cycle, event).await.unwrap();

    assert!(matches!(outcome, Outcome::EntryGranted { .. }));
    assert_eq!(
        h.ocr.calls(),
        vec![b"entry-crop".to_vec(), b"wide-crop".to_vec()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_plate_aborts_without_gate_action() {
    let h = harness(ControllerConfig::default());
    let mut cycle = GateCycle::new(Direction::Entry);

    h.ocr.push_failure("camera glare");
    let outcome = h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();

    assert_eq!(outcome, Outcome::Unrecognized);
    assert_eq!(h.ocr.calls().len(), 2);
    assert!(h.board.sent_commands().is_empty());
    assert_eq!(h.store.count_active().await.unwrap(), 0);
    assert_eq!(event_kinds(&h.store).await, vec![GateEventKind::RecognitionFailed]);
    assert_eq!(cycle.current_state(), CycleState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_command_retried_with_backoff() {
    let h = harness(ControllerConfig::default());
    let mut cycle = GateCycle::new(Direction::Entry);

    h.board.fail_next_sends(2);
    h.ocr.push_text("AB12CDE");
    let started = Instant::now();
    let outcome = h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();

    assert!(matches!(outcome, Outcome::EntryGranted { gate_fault: false, .. }));
    // 200 ms + 400 ms of backoff before the open went through, then settle
    assert!(started.elapsed() >= StdDuration::from_millis(5_600));
    assert_eq!(
        h.board.sent_commands(),
        vec![GateCommand::OpenEntry, GateCommand::CloseEntry]
    );
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_leave_session_and_record_fault() {
    let h = harness(ControllerConfig::default());
    let mut cycle = GateCycle::new(Direction::Entry);
    let mut events = h.controller.subscribe();

    h.board.fail_next_sends(3);
    h.ocr.push_text("AB12CDE");
    let outcome = h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();

    assert!(matches!(outcome, Outcome::EntryGranted { gate_fault: true, .. }));
    // The close is still sent after a failed open.
    assert_eq!(h.board.sent_commands(), vec![GateCommand::CloseEntry]);
    assert_eq!(h.store.count_active().await.unwrap(), 1);
    assert_eq!(
        event_kinds(&h.store).await,
        vec![GateEventKind::EntryGranted, GateEventKind::GateFault]
    );
    assert_eq!(cycle.current_state(), CycleState::Idle);
    let visited = cycle.last_cycle();
    assert!(visited.contains(&CycleState::Settling));
    assert!(visited.contains(&CycleState::Closing));

    let mut saw_fault = false;
    while let Ok(event) = events.try_recv() {
        if let ControllerEvent::GateFault { command, .. } = event {
            assert_eq!(command, GateCommand::OpenEntry);
            saw_fault = true;
        }
    }
    assert!(saw_fault);
}

#[tokio::test(start_paused = true)]
async fn test_failed_open_and_close_record_two_faults() {
    let h = harness(ControllerConfig::default());
    let mut cycle = GateCycle::new(Direction::Entry);
    let mut events = h.controller.subscribe();

    h.board.fail_next_sends(6);
    h.ocr.push_text("AB12CDE");
    let outcome = h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();

    assert!(matches!(outcome, Outcome::EntryGranted { gate_fault: true, .. }));
    assert!(h.board.sent_commands().is_empty());
    assert_eq!(
        event_kinds(&h.store).await,
        vec![
            GateEventKind::EntryGranted,
            GateEventKind::GateFault,
            GateEventKind::GateFault
        ]
    );
    assert_eq!(cycle.current_state(), CycleState::Idle);

    let mut faulted = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ControllerEvent::GateFault { command, .. } = event {
            faulted.push(command);
        }
    }
    assert_eq!(faulted, vec![GateCommand::OpenEntry, GateCommand::CloseEntry]);
}

#[tokio::test(start_paused = true)]
async fn test_open_skipped_when_gate_already_open() {
    let h = harness(ControllerConfig::default());
    let mut cycle = GateCycle::new(Direction::Entry);

    h.controller
        .link()
        .send_command(GateCommand::OpenEntry)
        .await
        .unwrap();
    h.board.clear_sent();

    h.ocr.push_text("AB12CDE");
    h.controller.handle_event(&mut cycle, entry_event()).await.unwrap();

    assert_eq!(h.board.sent_commands(), vec![GateCommand::CloseEntry]);
}

#[tokio::test(start_paused = true)]
async fn test_event_for_wrong_gate_is_rejected() {
    let h = harness(ControllerConfig::default());
    let mut cycle = GateCycle::new(Direction::Entry);

    let result = h.controller.handle_event(&mut cycle, exit_event()).await;
    assert!(result.is_err());
    assert!(h.ocr.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clock_skew_on_exit_still_charges_one_unit() {
    let h = harness(ControllerConfig::default());
    let mut entry = GateCycle::new(Direction::Entry);
    let mut exit = GateCycle::new(Direction::Exit);

    h.ocr.push_text("AB12CDE");
    h.controller.handle_event(&mut entry, entry_event()).await.unwrap();

    h.clock.set(t0() - Duration::minutes(5));
    h.ocr.push_text("AB12CDE");
    let outcome = h.controller.handle_event(&mut exit, exit_event()).await.unwrap();

    let Outcome::ExitGranted { receipt, .. } = outcome else {
        panic!("expected exit granted, got {outcome:?}");
    };
    assert!(receipt.exit_time > receipt.entry_time);
    assert_eq!(receipt.fee, Money::from_minor(200));
}
