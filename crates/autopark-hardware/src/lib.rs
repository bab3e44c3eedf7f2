//! Gate link: the host side of the serial connection to the gate board.
//!
//! The microcontroller drives the barrier servos, the buzzer and the slot
//! sensor. This crate hides the channel to it behind the [`GateLink`]
//! trait:
//!
//! - [`LineGateLink`] speaks the line protocol over any async byte stream
//! - [`open_serial`] bridges a real UART into a `LineGateLink`
//! - [`MockGateLink`](mock::MockGateLink) records commands for tests
//! - [`AnyGateLink`](devices::AnyGateLink) selects one at runtime
//!
//! Each link keeps a [`LinkState`] mirror: slot occupancy as last reported
//! by the board and the believed position of both gates.

pub mod devices;
pub mod error;
pub mod line_link;
pub mod mock;
pub mod serial;
pub mod traits;
pub mod types;

pub use devices::AnyGateLink;
pub use error::{LinkError, Result};
pub use line_link::LineGateLink;
pub use serial::{SerialConfig, SerialGateLink, detect_port, open_serial};
pub use traits::GateLink;
pub use types::{GateState, LinkInfo, LinkState, SlotState};
