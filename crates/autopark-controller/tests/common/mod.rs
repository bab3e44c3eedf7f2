#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use autopark_controller::{Controller, ControllerConfig};
use autopark_core::{ManualClock, Money};
use autopark_hardware::mock::{MockGateLink, MockGateLinkHandle};
use autopark_recognizer::{MockRecognizer, MockRecognizerHandle};
use autopark_storage::{MemoryStore, SessionLedger, Tariff};
use chrono::{DateTime, TimeZone, Utc};

pub struct Harness {
    pub controller: Controller,
    pub board: MockGateLinkHandle,
    pub ocr: MockRecognizerHandle,
    pub clock: ManualClock,
    pub store: MemoryStore,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 20, 7, 30, 0).unwrap()
}

/// Controller over mocks with an hourly tariff of 2.00.
pub fn harness(config: ControllerConfig) -> Harness {
    let (link, board) = MockGateLink::new();
    let (recognizer, ocr) = MockRecognizer::new();
    let store = MemoryStore::new();
    let tariff = Tariff::new(StdDuration::from_secs(3600), Money::from_minor(200)).unwrap();
    let ledger = SessionLedger::new(store.clone().into(), tariff);
    let clock = ManualClock::new(t0());

    let controller = Controller::new(link.into(), recognizer.into(), ledger, config)
        .unwrap()
        .with_clock(Arc::new(clock.clone()));

    Harness {
        controller,
        board,
        ocr,
        clock,
        store,
    }
}
