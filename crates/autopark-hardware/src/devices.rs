//! Enum wrapper for gate link dispatch.
//!
//! `GateLink` uses native `async fn`, so `Box<dyn GateLink>` is not
//! available. [`AnyGateLink`] gives the controller one concrete type that
//! covers every implementation selected at startup.
//!
//! ```
//! use autopark_hardware::devices::AnyGateLink;
//! use autopark_hardware::mock::MockGateLink;
//! use autopark_hardware::traits::GateLink;
//!
//! let (mock, _handle) = MockGateLink::new();
//! let link = AnyGateLink::Mock(mock);
//! assert!(link.is_connected());
//! ```

use autopark_protocol::{GateCommand, Notification};

use crate::mock::MockGateLink;
use crate::serial::SerialGateLink;
use crate::traits::GateLink;
use crate::types::{GateState, LinkInfo, SlotState};
use crate::Result;

#[derive(Debug)]
#[non_exhaustive]
pub enum AnyGateLink {
    /// Line protocol over a serial port (or any duplex pipe).
    Serial(SerialGateLink),

    /// Mock link for development and testing.
    Mock(MockGateLink),
}

impl From<SerialGateLink> for AnyGateLink {
    fn from(link: SerialGateLink) -> Self {
        Self::Serial(link)
    }
}

impl From<MockGateLink> for AnyGateLink {
    fn from(link: MockGateLink) -> Self {
        Self::Mock(link)
    }
}

impl GateLink for AnyGateLink {
    async fn send_command(&self, command: GateCommand) -> Result<()> {
        match self {
            Self::Serial(link) => link.send_command(command).await,
            Self::Mock(link) => link.send_command(command).await,
        }
    }

    fn poll_notifications(&self) -> Vec<Notification> {
        match self {
            Self::Serial(link) => link.poll_notifications(),
            Self::Mock(link) => link.poll_notifications(),
        }
    }

    fn slot_state(&self) -> SlotState {
        match self {
            Self::Serial(link) => link.slot_state(),
            Self::Mock(link) => link.slot_state(),
        }
    }

    fn gate_state(&self) -> GateState {
        match self {
            Self::Serial(link) => link.gate_state(),
            Self::Mock(link) => link.gate_state(),
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Serial(link) => link.is_connected(),
            Self::Mock(link) => link.is_connected(),
        }
    }

    fn info(&self) -> LinkInfo {
        match self {
            Self::Serial(link) => link.info(),
            Self::Mock(link) => link.info(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LineGateLink;

    #[tokio::test]
    async fn test_dispatch_to_mock() {
        let (mock, handle) = MockGateLink::new();
        let link = AnyGateLink::from(mock);

        link.send_command(GateCommand::OpenEntry).await.unwrap();
        assert!(link.gate_state().entry_open);
        assert_eq!(handle.sent_commands(), vec![GateCommand::OpenEntry]);
        assert_eq!(link.info().transport, "mock");
    }

    #[tokio::test]
    async fn test_dispatch_to_stream() {
        let (host, _board) = tokio::io::duplex(64);
        let link = AnyGateLink::from(LineGateLink::new("pipe", host));

        assert!(link.is_connected());
        assert_eq!(link.info().name, "pipe");
    }
}
