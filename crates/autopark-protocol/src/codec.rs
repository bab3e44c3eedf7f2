//! Tokio codec for the gate link.
//!
//! `GateLinkCodec` is the host side of the link: it decodes inbound lines
//! into [`Inbound`] values and encodes [`GateCommand`]s as
//! newline-terminated tokens.
//!
//! Decoding never fails on bad input. Unknown tokens come out as
//! [`Inbound::Unrecognized`] and overlong lines are dropped, so a noisy
//! UART cannot terminate a `Framed` stream.
//!
//! ```rust,no_run
//! use autopark_protocol::{GateCommand, GateLinkCodec, Inbound};
//! use futures::{SinkExt, StreamExt};
//! use tokio_util::codec::Framed;
//!
//! # async fn example(port: tokio::io::DuplexStream) -> autopark_protocol::Result<()> {
//! let mut framed = Framed::new(port, GateLinkCodec::new());
//! framed.send(GateCommand::OpenEntry).await?;
//!
//! while let Some(inbound) = framed.next().await {
//!     if let Inbound::Notification(n) = inbound? {
//!         println!("slot occupied: {}", n.occupied());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use autopark_core::constants::LINE_TERMINATOR;

use crate::{GateCommand, Inbound, LineParser, ProtocolError};

/// Host-side codec: decodes [`Inbound`], encodes [`GateCommand`].
#[derive(Debug, Default)]
pub struct GateLinkCodec {
    parser: LineParser,
    reported_discards: u64,
}

impl GateLinkCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            parser: LineParser::with_max_line_length(max_line_length),
            reported_discards: 0,
        }
    }

    pub fn max_line_length(&self) -> usize {
        self.parser.max_line_length()
    }

    fn report_discards(&mut self) {
        let discarded = self.parser.discarded();
        if discarded > self.reported_discards {
            warn!(
                count = discarded - self.reported_discards,
                max = self.parser.max_line_length(),
                "discarded overlong gate link line"
            );
            self.reported_discards = discarded;
        }
    }
}

impl Decoder for GateLinkCodec {
    type Item = Inbound;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            self.parser.feed(src);
            src.clear();
            self.report_discards();
        }

        Ok(self.parser.next_line().map(Inbound::from_line))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        self.parser.finish();
        self.report_discards();
        Ok(self.parser.next_line().map(Inbound::from_line))
    }
}

impl Encoder<GateCommand> for GateLinkCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: GateCommand, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let token = item.as_str().as_bytes();
        dst.reserve(token.len() + 1);
        dst.extend_from_slice(token);
        dst.extend_from_slice(&[LINE_TERMINATOR]);
        Ok(())
    }
}
