//! Gate link over any async byte stream.
//!
//! [`LineGateLink`] frames a transport with
//! [`GateLinkCodec`](autopark_protocol::GateLinkCodec) and splits it:
//!
//! ```text
//!              ┌──────────────── LineGateLink ────────────────┐
//! send_command │ Mutex<sink> ──(write timeout)──> transport   │
//!              │                                              │
//! poll         │ queue <── reader task <── transport          │
//!              └──────────────────────────────────────────────┘
//! ```
//!
//! The reader task owns the read half and pushes every decoded line into an
//! unbounded queue. `poll_notifications` drains that queue without waiting,
//! so reading never blocks command issuance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, trace, warn};

use autopark_core::constants::DEFAULT_WRITE_TIMEOUT_MS;
use autopark_protocol::{GateCommand, GateLinkCodec, Inbound, Notification, ProtocolError};

use crate::error::{LinkError, Result};
use crate::traits::GateLink;
use crate::types::{GateState, LinkInfo, LinkState, SlotState};

type CommandSink<T> = SplitSink<Framed<T, GateLinkCodec>, GateCommand>;

/// Gate link speaking the line protocol over transport `T`.
///
/// # Examples
///
/// ```
/// use autopark_hardware::{GateLink, LineGateLink};
/// use autopark_protocol::GateCommand;
///
/// #[tokio::main]
/// async fn main() -> autopark_hardware::Result<()> {
///     let (host, _board) = tokio::io::duplex(256);
///     let link = LineGateLink::new("bench", host);
///
///     link.send_command(GateCommand::OpenEntry).await?;
///     assert!(link.gate_state().entry_open);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct LineGateLink<T> {
    info: LinkInfo,
    sink: tokio::sync::Mutex<CommandSink<T>>,
    inbound: Mutex<mpsc::UnboundedReceiver<Inbound>>,
    state: Mutex<LinkState>,
    connected: Arc<AtomicBool>,
    write_timeout: Duration,
    reader: JoinHandle<()>,
}

impl<T> LineGateLink<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap a transport with the default write timeout.
    ///
    /// Must be called from within a Tokio runtime: the reader task is
    /// spawned immediately.
    pub fn new(name: impl Into<String>, transport: T) -> Self {
        let name = name.into();
        let info = LinkInfo::new(name, "stream");
        Self::with_info(info, transport, Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS))
    }

    pub fn with_info(info: LinkInfo, transport: T, write_timeout: Duration) -> Self {
        let (sink, mut stream) = Framed::new(transport, GateLinkCodec::new()).split();
        let (tx, rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));

        let reader_connected = Arc::clone(&connected);
        let link_name = info.name.clone();
        let reader = tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(inbound) => {
                        if tx.send(inbound).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(link = %link_name, error = %e, "gate link read failed");
                        break;
                    }
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
            debug!(link = %link_name, "gate link reader stopped");
        });

        Self {
            info,
            sink: tokio::sync::Mutex::new(sink),
            inbound: Mutex::new(rx),
            state: Mutex::new(LinkState::new()),
            connected,
            write_timeout,
            reader,
        }
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }
}

impl<T> LineGateLink<T> {
    fn state(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Drop for LineGateLink<T> {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl<T> GateLink for LineGateLink<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send_command(&self, command: GateCommand) -> Result<()> {
        if !self.is_connected() {
            return Err(LinkError::disconnected(&self.info.name));
        }

        let mut sink = self.sink.lock().await;
        match tokio::time::timeout(self.write_timeout, sink.send(command)).await {
            Ok(Ok(())) => {
                self.state().apply_command(command);
                trace!(link = %self.info.name, command = %command, "command sent");
                Ok(())
            }
            Ok(Err(ProtocolError::Io(e))) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(LinkError::Io(e))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(LinkError::timeout(self.write_timeout.as_millis() as u64)),
        }
    }

    fn poll_notifications(&self) -> Vec<Notification> {
        let mut inbound = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        let mut notifications = Vec::new();

        while let Ok(item) = inbound.try_recv() {
            match item {
                Inbound::Notification(notification) => {
                    self.state().apply_notification(notification, Utc::now());
                    debug!(link = %self.info.name, notification = %notification, "notification received");
                    notifications.push(notification);
                }
                Inbound::Unrecognized(line) => {
                    warn!(link = %self.info.name, line = %line, "ignoring unrecognized gate link token");
                }
            }
        }

        notifications
    }

    fn slot_state(&self) -> SlotState {
        self.state().slot()
    }

    fn gate_state(&self) -> GateState {
        self.state().gates()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn info(&self) -> LinkInfo {
        self.info.clone()
    }
}
