//! Gate link trait definition.
//!
//! Uses native `async fn` in traits (Edition 2024). The trait is therefore
//! not object-safe; code that needs runtime selection goes through
//! [`AnyGateLink`](crate::devices::AnyGateLink).

#![allow(async_fn_in_trait)]

use autopark_protocol::{GateCommand, Notification};

use crate::error::Result;
use crate::types::{GateState, LinkInfo, SlotState};

/// Line-based command/notification exchange with the gate microcontroller.
///
/// All methods take `&self`: implementations lock internally, so one link
/// can be shared by both gate workers and the notification poller. Command
/// writes are serialised through a single send path.
///
/// # Examples
///
/// ```no_run
/// use autopark_hardware::traits::GateLink;
/// use autopark_hardware::Result;
/// use autopark_protocol::GateCommand;
///
/// async fn pulse_buzzer<L: GateLink>(link: &L) -> Result<()> {
///     link.send_command(GateCommand::BuzzerOn).await?;
///     tokio::time::sleep(std::time::Duration::from_secs(3)).await;
///     link.send_command(GateCommand::BuzzerOff).await
/// }
/// ```
pub trait GateLink: Send + Sync {
    /// Write one command as a newline-terminated token.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The channel is unavailable
    /// - The write does not complete within the write timeout
    async fn send_command(&self, command: GateCommand) -> Result<()>;

    /// Drain every notification parsed since the previous poll, in arrival
    /// order, applying each one to the slot state. Never blocks.
    fn poll_notifications(&self) -> Vec<Notification>;

    fn slot_state(&self) -> SlotState;

    fn gate_state(&self) -> GateState;

    fn is_connected(&self) -> bool;

    fn info(&self) -> LinkInfo;
}
