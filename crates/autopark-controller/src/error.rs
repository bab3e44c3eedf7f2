use thiserror::Error;

use autopark_core::Direction;
use autopark_storage::LedgerError;

use crate::state_machine::CycleState;

#[derive(Debug, Error)]
pub enum ControllerError {
    /// A workflow tried to move its gate cycle along an edge that does not exist
    #[error("Invalid {gate} gate transition: {from} -> {to}")]
    InvalidTransition {
        gate: Direction,
        from: CycleState,
        to: CycleState,
    },

    /// A plate event was handed to the other gate's cycle
    #[error("{got} event handed to the {expected} gate")]
    GateMismatch { expected: Direction, got: Direction },

    /// The ledger could not be read or written
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The gate's event queue is full; the event was dropped
    #[error("{gate} gate busy, event dropped")]
    QueueFull { gate: Direction },

    /// The controller no longer accepts events
    #[error("Controller is shutting down")]
    ShuttingDown,

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ControllerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;
