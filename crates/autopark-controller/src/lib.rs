//! Parking controller: entry and exit workflows over a gate link, a plate
//! recognizer and the session ledger.
//!
//! ```no_run
//! use autopark_controller::{Controller, ControllerConfig, PlateEvent, start};
//! use autopark_core::Direction;
//! use autopark_hardware::mock::MockGateLink;
//! use autopark_recognizer::MockRecognizer;
//! use autopark_storage::{MemoryStore, SessionLedger, Tariff};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (link, _board) = MockGateLink::new();
//! let (recognizer, ocr) = MockRecognizer::new();
//! let ledger = SessionLedger::new(MemoryStore::new().into(), Tariff::default());
//!
//! let controller = Controller::new(link.into(), recognizer.into(), ledger, ControllerConfig::default())?;
//! let handle = start(controller);
//!
//! ocr.push_text("AB12CDE");
//! handle.submit(PlateEvent::new(Direction::Entry, std::fs::read("crop.jpg")?))?;
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod runtime;
pub mod state_machine;

pub use config::ControllerConfig;
pub use controller::{Controller, EVENT_CHANNEL_CAPACITY, Ledger, Outcome};
pub use error::{ControllerError, Result};
pub use events::{ControllerEvent, PlateEvent, Receipt};
pub use runtime::{ControllerHandle, start};
pub use state_machine::{CycleState, GateCycle};
