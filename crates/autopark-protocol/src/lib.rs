//! Gate link wire protocol.
//!
//! The car park controller talks to the gate microcontroller over a UART
//! using newline-terminated ASCII tokens:
//!
//! ```text
//! host -> board   OPEN_ENTRY_GATE | CLOSE_ENTRY_GATE | OPEN_EXIT_GATE
//!                 CLOSE_EXIT_GATE | BUZZER_ON | BUZZER_OFF
//! board -> host   SLOT_OCCUPIED | SLOT_FREE
//! ```
//!
//! [`LineParser`] splits a raw byte stream into trimmed lines and
//! [`GateLinkCodec`] plugs it into `tokio_util::codec::Framed`.

pub mod codec;
pub mod commands;
pub mod error;
pub mod line_parser;

pub use codec::GateLinkCodec;
pub use commands::{GateCommand, Inbound, Notification};
pub use error::{ProtocolError, Result};
pub use line_parser::{DrainLines, LineParser, ParserState};
