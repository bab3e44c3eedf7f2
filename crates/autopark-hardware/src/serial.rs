//! Serial port bridge and port detection.
//!
//! `serialport` is blocking. [`open_serial`] opens the UART, waits for the
//! board to come out of reset, then moves the port onto two OS threads that
//! pump bytes between it and one end of a `tokio::io::duplex` pipe. The
//! other end is handed to a [`LineGateLink`], so the async side never sees
//! a blocking call.
//!
//! ```text
//! UART ──read thread──> duplex ──> LineGateLink reader task
//! UART <──write thread── duplex <── LineGateLink sink
//! ```

use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort, SerialPortType};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use autopark_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_OPEN_SETTLE_MS, DEFAULT_WRITE_TIMEOUT_MS};

use crate::error::{LinkError, Result};
use crate::line_link::LineGateLink;
use crate::types::LinkInfo;

/// Link type produced by [`open_serial`].
pub type SerialGateLink = LineGateLink<DuplexStream>;

/// Substrings identifying USB-serial adapters used by gate controller boards.
pub const KNOWN_ADAPTERS: [&str; 5] = ["ESP32", "CH340", "CP210", "FTDI", "USB SERIAL"];

/// Device paths tried, in order, when no adapter is recognized.
pub const FALLBACK_PORTS: [&str; 4] = ["/dev/ttyUSB0", "/dev/ttyACM0", "/dev/ttyUSB1", "/dev/ttyACM1"];

/// Blocking read timeout on the port. Bounds how long the read thread
/// takes to notice the link was dropped.
const PORT_READ_TIMEOUT: Duration = Duration::from_millis(100);

const BRIDGE_BUFFER_SIZE: usize = 4096;

/// Serial port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port path; `None` means auto-detect.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub write_timeout: Duration,
    /// Wait after opening before any traffic (board reset).
    pub open_settle: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
            open_settle: Duration::from_millis(DEFAULT_OPEN_SETTLE_MS),
        }
    }
}

/// Open the configured (or detected) serial port as a gate link.
///
/// # Errors
///
/// Returns an error if no port is configured and none can be detected, or
/// if the port cannot be opened or configured.
pub async fn open_serial(config: &SerialConfig) -> Result<SerialGateLink> {
    let path = match &config.port {
        Some(port) => port.clone(),
        None => detect_port()?,
    };

    let open_path = path.clone();
    let baud_rate = config.baud_rate;
    let port = tokio::task::spawn_blocking(move || {
        serialport::new(&open_path, baud_rate)
            .timeout(PORT_READ_TIMEOUT)
            .open()
    })
    .await
    .map_err(|e| LinkError::open_failed(&path, e.to_string()))?
    .map_err(|e| LinkError::open_failed(&path, e.to_string()))?;

    info!(port = %path, baud_rate, "serial port opened, waiting for board reset");
    tokio::time::sleep(config.open_settle).await;

    port.clear(ClearBuffer::All)
        .map_err(|e| LinkError::open_failed(&path, e.to_string()))?;
    let reader = port
        .try_clone()
        .map_err(|e| LinkError::open_failed(&path, e.to_string()))?;

    let (host, bridge) = tokio::io::duplex(BRIDGE_BUFFER_SIZE);
    spawn_bridge(&path, reader, port, bridge)?;

    let info = LinkInfo::new(path, format!("serial {baud_rate} baud"));
    Ok(LineGateLink::with_info(info, host, config.write_timeout))
}

fn spawn_bridge(
    path: &str,
    reader: Box<dyn SerialPort>,
    writer: Box<dyn SerialPort>,
    bridge: DuplexStream,
) -> Result<()> {
    let handle = Handle::current();
    let closed = Arc::new(AtomicBool::new(false));
    let (bridge_rx, bridge_tx) = tokio::io::split(bridge);

    let read_closed = Arc::clone(&closed);
    let read_handle = handle.clone();
    let read_path = path.to_string();
    std::thread::Builder::new()
        .name("serial-read".to_string())
        .spawn(move || pump_port_to_link(&read_path, reader, bridge_tx, &read_handle, &read_closed))?;

    let write_path = path.to_string();
    std::thread::Builder::new()
        .name("serial-write".to_string())
        .spawn(move || pump_link_to_port(&write_path, writer, bridge_rx, &handle, &closed))?;

    Ok(())
}

fn pump_port_to_link(
    path: &str,
    mut port: Box<dyn SerialPort>,
    mut link: WriteHalf<DuplexStream>,
    handle: &Handle,
    closed: &AtomicBool,
) {
    let mut buf = [0u8; 256];
    while !closed.load(Ordering::SeqCst) {
        match port.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                if handle.block_on(link.write_all(&buf[..n])).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                error!(port = %path, error = %e, "serial read failed");
                break;
            }
        }
    }
    let _ = handle.block_on(link.shutdown());
    debug!(port = %path, "serial read bridge stopped");
}

fn pump_link_to_port(
    path: &str,
    mut port: Box<dyn SerialPort>,
    mut link: ReadHalf<DuplexStream>,
    handle: &Handle,
    closed: &AtomicBool,
) {
    let mut buf = [0u8; 256];
    loop {
        match handle.block_on(link.read(&mut buf)) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Err(e) = port.write_all(&buf[..n]).and_then(|()| port.flush()) {
                    error!(port = %path, error = %e, "serial write failed");
                    break;
                }
            }
        }
    }
    closed.store(true, Ordering::SeqCst);
    debug!(port = %path, "serial write bridge stopped");
}

/// Find the serial port the gate board is attached to.
///
/// USB adapters whose manufacturer or product mentions a known chip are
/// preferred; otherwise the first existing fallback path is used.
///
/// # Errors
///
/// Returns [`LinkError::PortNotFound`] when nothing matches.
pub fn detect_port() -> Result<String> {
    let ports = serialport::available_ports().unwrap_or_else(|e| {
        warn!(error = %e, "could not enumerate serial ports");
        Vec::new()
    });

    let candidates = ports.into_iter().map(|p| {
        let description = match &p.port_type {
            SerialPortType::UsbPort(usb) => format!(
                "{} {}",
                usb.manufacturer.as_deref().unwrap_or_default(),
                usb.product.as_deref().unwrap_or_default()
            ),
            _ => String::new(),
        };
        (p.port_name, description)
    });

    select_port(candidates, |path| Path::new(path).exists()).ok_or_else(|| {
        LinkError::port_not_found(format!(
            "no known USB adapter and none of {} exist",
            FALLBACK_PORTS.join(", ")
        ))
    })
}

/// Pick a port from `(path, description)` pairs.
pub fn select_port<I, F>(candidates: I, exists: F) -> Option<String>
where
    I: IntoIterator<Item = (String, String)>,
    F: Fn(&str) -> bool,
{
    for (path, description) in candidates {
        let description = description.to_uppercase();
        if KNOWN_ADAPTERS.iter().any(|known| description.contains(known)) {
            debug!(port = %path, description = %description, "detected gate board adapter");
            return Some(path);
        }
    }

    FALLBACK_PORTS
        .iter()
        .find(|path| exists(path))
        .map(|path| path.to_string())
}
