//! Session ledger and persistence for the car park controller.
//!
//! # Architecture
//!
//! - [`SessionLedger`]: business rules for active sessions, exits and fees
//! - [`LedgerStore`]: storage contract, implemented by [`MemoryStore`] and
//!   [`SqliteStore`] and dispatched through [`AnyLedgerStore`]
//! - [`Database`]: SQLite pool with embedded migrations (WAL journal)
//! - [`fee`]: billing per started unit and receipt duration text
//!
//! # Example
//!
//! ```no_run
//! use autopark_core::{Plate, SlotId};
//! use autopark_storage::{SessionLedger, StorageConfig, Tariff};
//! use chrono::Utc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StorageConfig::Sqlite { path: "autopark.db".into() }.open().await?;
//! let ledger = SessionLedger::new(store, Tariff::default());
//!
//! let plate = Plate::new("AB12CDE")?;
//! ledger.begin_session(&plate, SlotId::FIRST, Utc::now()).await?;
//! for session in ledger.active_sessions().await? {
//!     println!("{} in slot {}", session.plate, session.slot_id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod fee;
pub mod ledger;
pub mod models;
pub mod stores;

pub use config::StorageConfig;
pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use fee::{Tariff, TariffConfig, format_duration};
pub use ledger::{LedgerError, LedgerResult, SessionLedger};
pub use models::{GateEvent, GateEventKind, ParkingSession};
pub use stores::{AnyLedgerStore, LedgerStore, MemoryStore, SqliteStore};
