//! Ledger records and their database row forms.

pub mod gate_event;
pub mod session;

pub use gate_event::{GateEvent, GateEventKind, GateEventRow};
pub use session::{ActiveSessionRow, HistoryRow, ParkingSession};
