//! Error types for gate link operations.

use autopark_protocol::ProtocolError;

/// Result type alias for gate link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors that can occur while talking to the gate microcontroller.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The channel is closed or was never opened.
    #[error("Gate link disconnected: {link}")]
    Disconnected { link: String },

    /// A command write did not complete in time.
    #[error("Command write timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// No serial port could be found for the microcontroller.
    #[error("Serial port not found: {message}")]
    PortNotFound { message: String },

    /// The serial port exists but could not be opened or configured.
    #[error("Failed to open {port}: {message}")]
    OpenFailed { port: String, message: String },

    /// The write path failed.
    #[error("Communication error: {message}")]
    Communication { message: String },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    pub fn disconnected(link: impl Into<String>) -> Self {
        Self::Disconnected { link: link.into() }
    }

    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn port_not_found(message: impl Into<String>) -> Self {
        Self::PortNotFound {
            message: message.into(),
        }
    }

    pub fn open_failed(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }
}
