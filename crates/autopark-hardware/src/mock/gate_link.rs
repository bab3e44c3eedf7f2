//! Mock gate link for testing and development.
//!
//! The mock records every accepted command and lets a [`MockGateLinkHandle`]
//! play the microcontroller: inject slot notifications, make the next sends
//! fail, or pull the cable.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::Notify;
use tracing::trace;

use autopark_protocol::{GateCommand, Notification};

use crate::error::{LinkError, Result};
use crate::traits::GateLink;
use crate::types::{GateState, LinkInfo, LinkState, SlotState};

#[derive(Debug)]
struct MockState {
    sent: Vec<GateCommand>,
    pending: VecDeque<Notification>,
    link: LinkState,
    failures_left: u32,
    connected: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<MockState>,
    sent_notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mock gate link.
///
/// # Examples
///
/// ```
/// use autopark_hardware::mock::MockGateLink;
/// use autopark_hardware::traits::GateLink;
/// use autopark_protocol::{GateCommand, Notification};
///
/// #[tokio::main]
/// async fn main() -> autopark_hardware::Result<()> {
///     let (link, handle) = MockGateLink::new();
///
///     handle.notify(Notification::SlotOccupied);
///     assert_eq!(link.poll_notifications(), vec![Notification::SlotOccupied]);
///     assert!(link.slot_state().occupied);
///
///     link.send_command(GateCommand::BuzzerOn).await?;
///     assert_eq!(handle.sent_commands(), vec![GateCommand::BuzzerOn]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockGateLink {
    shared: Arc<Shared>,
    name: String,
}

impl MockGateLink {
    pub fn new() -> (Self, MockGateLinkHandle) {
        Self::with_name("Mock Gate Link")
    }

    pub fn with_name(name: impl Into<String>) -> (Self, MockGateLinkHandle) {
        let shared = Arc::new(Shared {
            state: Mutex::new(MockState {
                sent: Vec::new(),
                pending: VecDeque::new(),
                link: LinkState::new(),
                failures_left: 0,
                connected: true,
            }),
            sent_notify: Notify::new(),
        });

        let link = Self {
            shared: Arc::clone(&shared),
            name: name.into(),
        };
        (link, MockGateLinkHandle { shared })
    }
}

impl GateLink for MockGateLink {
    async fn send_command(&self, command: GateCommand) -> Result<()> {
        {
            let mut state = self.shared.lock();
            if !state.connected {
                return Err(LinkError::disconnected(&self.name));
            }
            if state.failures_left > 0 {
                state.failures_left -= 1;
                return Err(LinkError::communication(format!(
                    "injected failure sending {command}"
                )));
            }
            state.sent.push(command);
            state.link.apply_command(command);
        }
        trace!(command = %command, "mock command accepted");
        self.shared.sent_notify.notify_waiters();
        Ok(())
    }

    fn poll_notifications(&self) -> Vec<Notification> {
        let mut state = self.shared.lock();
        let drained: Vec<Notification> = state.pending.drain(..).collect();
        let now = Utc::now();
        for notification in &drained {
            state.link.apply_notification(*notification, now);
        }
        drained
    }

    fn slot_state(&self) -> SlotState {
        self.shared.lock().link.slot()
    }

    fn gate_state(&self) -> GateState {
        self.shared.lock().link.gates()
    }

    fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    fn info(&self) -> LinkInfo {
        LinkInfo::new(self.name.clone(), "mock")
    }
}

/// Handle for driving a [`MockGateLink`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MockGateLinkHandle {
    shared: Arc<Shared>,
}

impl MockGateLinkHandle {
    /// Queue a notification as if the board had sent it.
    pub fn notify(&self, notification: Notification) {
        self.shared.lock().pending.push_back(notification);
    }

    /// Every command accepted so far, in order.
    pub fn sent_commands(&self) -> Vec<GateCommand> {
        self.shared.lock().sent.clone()
    }

    pub fn clear_sent(&self) {
        self.shared.lock().sent.clear();
    }

    /// Make the next `count` sends fail with a communication error.
    pub fn fail_next_sends(&self, count: u32) {
        self.shared.lock().failures_left = count;
    }

    pub fn set_connected(&self, connected: bool) {
        self.shared.lock().connected = connected;
    }

    /// Wait until at least `count` commands have been accepted.
    pub async fn wait_for_commands(&self, count: usize) {
        loop {
            let notified = self.shared.sent_notify.notified();
            if self.shared.lock().sent.len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_commands_and_gate_state() {
        let (link, handle) = MockGateLink::new();

        link.send_command(GateCommand::OpenEntry).await.unwrap();
        assert!(link.gate_state().entry_open);
        link.send_command(GateCommand::CloseEntry).await.unwrap();
        assert!(!link.gate_state().entry_open);

        assert_eq!(
            handle.sent_commands(),
            vec![GateCommand::OpenEntry, GateCommand::CloseEntry]
        );
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let (link, handle) = MockGateLink::new();
        handle.fail_next_sends(2);

        assert!(link.send_command(GateCommand::OpenExit).await.is_err());
        assert!(link.send_command(GateCommand::OpenExit).await.is_err());
        assert!(link.send_command(GateCommand::OpenExit).await.is_ok());
        assert_eq!(handle.sent_commands(), vec![GateCommand::OpenExit]);
    }

    #[tokio::test]
    async fn test_disconnected_rejects_sends() {
        let (link, handle) = MockGateLink::new();
        handle.set_connected(false);

        assert!(!link.is_connected());
        assert!(matches!(
            link.send_command(GateCommand::BuzzerOn).await,
            Err(LinkError::Disconnected { .. })
        ));
        assert!(handle.sent_commands().is_empty());
    }

    #[test]
    fn test_poll_drains_in_order() {
        let (link, handle) = MockGateLink::new();
        handle.notify(Notification::SlotOccupied);
        handle.notify(Notification::SlotFree);

        assert_eq!(
            link.poll_notifications(),
            vec![Notification::SlotOccupied, Notification::SlotFree]
        );
        assert!(!link.slot_state().occupied);
        assert!(link.poll_notifications().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_commands() {
        let (link, handle) = MockGateLink::new();

        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.wait_for_commands(2).await }
        });

        link.send_command(GateCommand::BuzzerOn).await.unwrap();
        link.send_command(GateCommand::BuzzerOff).await.unwrap();
        waiter.await.unwrap();
    }
}
