//! Entry and exit workflows.
//!
//! [`Controller`] is the only component that sequences the recognizer, the
//! gate link and the ledger. Each workflow walks the caller's
//! [`GateCycle`]; a workflow always finishes its open, settle and close
//! sequence before returning, so a gate worker never interleaves two
//! vehicles on one gate.
//!
//! The ledger sits behind a `tokio::sync::Mutex`. The entry workflow holds
//! it across the duplicate check, the fullness check and `begin_session`,
//! so the entry and exit workers cannot race each other into an
//! over-full lot.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};

use autopark_core::{Clock, Direction, Money, Plate, SystemClock};
use autopark_hardware::{AnyGateLink, GateLink, LinkError};
use autopark_protocol::{GateCommand, Notification};
use autopark_recognizer::{AnyRecognizer, PlateRecognizer, RecognizeError};
use autopark_storage::{
    AnyLedgerStore, GateEvent, GateEventKind, LedgerError, ParkingSession, SessionLedger,
    format_duration,
};

use crate::config::ControllerConfig;
use crate::error::{ControllerError, Result};
use crate::events::{ControllerEvent, PlateEvent, Receipt};
use crate::state_machine::{CycleState, GateCycle};

/// Events buffered per subscriber before the oldest are dropped.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

pub type Ledger = SessionLedger<AnyLedgerStore>;

/// What a workflow did with one plate event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Session opened and the entry gate cycled. `gate_fault` is set when a
    /// gate command failed after the session was recorded.
    EntryGranted {
        session: ParkingSession,
        gate_fault: bool,
    },
    /// Lot full; buzzer pulsed, gate stayed shut.
    EntryRejected { plate: Plate },
    /// The plate is already parked.
    DuplicateIgnored { plate: Plate },
    /// Session closed and the exit gate cycled.
    ExitGranted { receipt: Receipt, gate_fault: bool },
    /// No active session for the plate; exit gate stayed shut.
    ExitDenied { plate: Plate },
    /// No plate could be read; nothing happened.
    Unrecognized,
}

enum EntryDecision {
    Duplicate,
    Full { reason: String },
    Admit(ParkingSession),
}

/// The parking controller.
pub struct Controller {
    link: AnyGateLink,
    recognizer: AnyRecognizer,
    ledger: Mutex<Ledger>,
    config: ControllerConfig,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<ControllerEvent>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("link", &self.link.info())
            .field("recognizer", &self.recognizer.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// # Errors
    /// Fails if `config` does not validate.
    pub fn new(
        link: AnyGateLink,
        recognizer: AnyRecognizer,
        ledger: Ledger,
        config: ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            link,
            recognizer,
            ledger: Mutex::new(ledger),
            config,
            clock: Arc::new(SystemClock),
            events,
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn link(&self) -> &AnyGateLink {
        &self.link
    }

    pub fn ledger(&self) -> &Mutex<Ledger> {
        &self.ledger
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Run the workflow for `event` on `cycle`'s gate.
    ///
    /// Recognition failures, duplicates, full lots and unknown exits are
    /// normal outcomes. Errors are store failures and state machine
    /// violations; the cycle is reset to `Idle` before they are returned.
    pub async fn handle_event(&self, cycle: &mut GateCycle, event: PlateEvent) -> Result<Outcome> {
        if event.direction != cycle.gate() {
            return Err(ControllerError::GateMismatch {
                expected: cycle.gate(),
                got: event.direction,
            });
        }

        let result = match event.direction {
            Direction::Entry => self.run_entry(cycle, &event).await,
            Direction::Exit => self.run_exit(cycle, &event).await,
        };

        if result.is_err() && cycle.current_state() != CycleState::Idle {
            cycle.reset();
        }
        result
    }

    async fn run_entry(&self, cycle: &mut GateCycle, event: &PlateEvent) -> Result<Outcome> {
        cycle.transition_to(CycleState::Recognizing)?;
        let Some(plate) = self.recognize(cycle, event).await? else {
            return Ok(Outcome::Unrecognized);
        };

        cycle.transition_to(CycleState::Deciding)?;
        let decision = self.decide_entry(&plate).await?;

        match decision {
            EntryDecision::Duplicate => {
                info!(plate = %plate, "plate already parked, ignoring entry");
                self.record(
                    GateEvent::new(GateEventKind::DuplicateEntry, Direction::Entry, self.clock.now())
                        .with_plate(&plate),
                )
                .await;
                self.emit(ControllerEvent::DuplicateIgnored {
                    plate: plate.clone(),
                });
                cycle.transition_to(CycleState::Idle)?;
                Ok(Outcome::DuplicateIgnored { plate })
            }
            EntryDecision::Full { reason } => {
                warn!(plate = %plate, reason = %reason, "lot full, entry rejected");
                cycle.transition_to(CycleState::Rejecting)?;
                self.buzzer_pulse(&plate).await;
                self.record(
                    GateEvent::new(
                        GateEventKind::EntryRejectedFull,
                        Direction::Entry,
                        self.clock.now(),
                    )
                    .with_plate(&plate)
                    .with_detail(reason.clone()),
                )
                .await;
                self.emit(ControllerEvent::EntryRejected {
                    plate: plate.clone(),
                    reason,
                });
                cycle.transition_to(CycleState::Idle)?;
                Ok(Outcome::EntryRejected { plate })
            }
            EntryDecision::Admit(session) => {
                info!(plate = %plate, slot = %session.slot_id, "entry granted");
                self.record(
                    GateEvent::new(GateEventKind::EntryGranted, Direction::Entry, session.entry_time)
                        .with_plate(&plate)
                        .with_detail(format!("slot {}", session.slot_id)),
                )
                .await;
                self.emit(ControllerEvent::EntryGranted {
                    plate: plate.clone(),
                    slot_id: session.slot_id,
                    at: session.entry_time,
                });

                let gate_fault = self.cycle_gate(cycle, Direction::Entry, &plate).await?;
                Ok(Outcome::EntryGranted {
                    session,
                    gate_fault,
                })
            }
        }
    }

    /// Duplicate check, fullness check and session start under one lock.
    async fn decide_entry(&self, plate: &Plate) -> Result<EntryDecision> {
        let capacity = self.config.capacity;
        let ledger = self.ledger.lock().await;

        if ledger.has_active(plate).await? {
            return Ok(EntryDecision::Duplicate);
        }

        self.poll_notifications();
        let slot = self.link.slot_state();
        if slot.occupied {
            return Ok(EntryDecision::Full {
                reason: "slot sensor reports occupied".to_string(),
            });
        }
        if ledger.is_full(capacity).await? {
            return Ok(EntryDecision::Full {
                reason: format!("{capacity} of {capacity} slots taken"),
            });
        }

        let Some(slot_id) = ledger.available_slots(capacity).await?.into_iter().next() else {
            return Ok(EntryDecision::Full {
                reason: "no free slot id".to_string(),
            });
        };

        match ledger.begin_session(plate, slot_id, self.clock.now()).await {
            Ok(session) => Ok(EntryDecision::Admit(session)),
            Err(LedgerError::DuplicateActiveSession { .. }) => Ok(EntryDecision::Duplicate),
            Err(LedgerError::SlotTaken { slot }) => Ok(EntryDecision::Full {
                reason: format!("slot {slot} taken"),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn run_exit(&self, cycle: &mut GateCycle, event: &PlateEvent) -> Result<Outcome> {
        cycle.transition_to(CycleState::Recognizing)?;
        let Some(plate) = self.recognize(cycle, event).await? else {
            return Ok(Outcome::Unrecognized);
        };

        cycle.transition_to(CycleState::Deciding)?;
        let closed = {
            let ledger = self.ledger.lock().await;
            ledger.end_session(&plate, self.clock.now()).await
        };

        let (session, fee) = match closed {
            Ok(closed) => closed,
            Err(LedgerError::NoActiveSession { .. }) => {
                error!(plate = %plate, "exit requested with no active session, gate stays closed");
                let message = format!("exit denied: no active session for {plate}");
                self.record(
                    GateEvent::new(GateEventKind::ExitDenied, Direction::Exit, self.clock.now())
                        .with_plate(&plate)
                        .with_detail("no active session"),
                )
                .await;
                self.emit(ControllerEvent::Alert {
                    gate: Direction::Exit,
                    plate: Some(plate.clone()),
                    message,
                });
                cycle.transition_to(CycleState::Idle)?;
                return Ok(Outcome::ExitDenied { plate });
            }
            Err(e) => return Err(e.into()),
        };

        let receipt = receipt_for(&session, fee);
        info!(
            plate = %plate,
            duration = %receipt.duration,
            fee = %fee,
            "exit granted"
        );
        self.record(
            GateEvent::new(GateEventKind::ExitGranted, Direction::Exit, receipt.exit_time)
                .with_plate(&plate)
                .with_detail(format!("fee {fee}")),
        )
        .await;
        self.emit(ControllerEvent::Receipt(receipt.clone()));

        let gate_fault = self.cycle_gate(cycle, Direction::Exit, &plate).await?;
        Ok(Outcome::ExitGranted {
            receipt,
            gate_fault,
        })
    }

    /// Read the plate, retrying with the fallback image. `None` means the
    /// cycle is back in `Idle` and nothing else should happen.
    async fn recognize(&self, cycle: &mut GateCycle, event: &PlateEvent) -> Result<Option<Plate>> {
        let gate = event.direction;
        let attempts = self.config.recognition_attempts;
        let mut attempt = 1;

        let failure: RecognizeError = loop {
            match self.recognizer.recognize(event.image_for_attempt(attempt)).await {
                Ok(plate) => {
                    debug!(gate = %gate, plate = %plate, attempt, "plate recognized");
                    return Ok(Some(plate));
                }
                Err(e) if attempt < attempts => {
                    warn!(gate = %gate, attempt, error = %e, "recognition failed, retrying");
                    tokio::time::sleep(self.config.recognition_retry_delay()).await;
                    attempt += 1;
                }
                Err(e) => break e,
            }
        };

        warn!(gate = %gate, attempts, error = %failure, "no plate recognized, event dropped");
        self.record(
            GateEvent::new(GateEventKind::RecognitionFailed, gate, self.clock.now())
                .with_detail(failure.to_string()),
        )
        .await;
        self.emit(ControllerEvent::RecognitionFailed {
            gate,
            reason: failure.to_string(),
        });
        cycle.transition_to(CycleState::Idle)?;
        Ok(None)
    }

    /// Open, settle, close. Returns whether a gate command failed.
    async fn cycle_gate(&self, cycle: &mut GateCycle, gate: Direction, plate: &Plate) -> Result<bool> {
        cycle.transition_to(CycleState::Opening)?;
        let open = GateCommand::open(gate);
        let mut fault = false;

        if self.link.gate_state().is_open(gate) {
            info!(gate = %gate, "gate already open, skipping {open}");
        } else if let Err(e) = self.send_with_retry(open).await {
            // A timed-out write may still have reached the board; close anyway.
            self.gate_fault(gate, open, plate, &e).await;
            fault = true;
        }

        cycle.transition_to(CycleState::Settling)?;
        tokio::time::sleep(self.config.settle_delay()).await;

        cycle.transition_to(CycleState::Closing)?;
        let close = GateCommand::close(gate);
        if let Err(e) = self.send_with_retry(close).await {
            self.gate_fault(gate, close, plate, &e).await;
            fault = true;
        }

        cycle.transition_to(CycleState::Idle)?;
        Ok(fault)
    }

    async fn buzzer_pulse(&self, plate: &Plate) {
        if let Err(e) = self.send_with_retry(GateCommand::BuzzerOn).await {
            self.gate_fault(Direction::Entry, GateCommand::BuzzerOn, plate, &e)
                .await;
        } else {
            tokio::time::sleep(self.config.buzzer_duration()).await;
        }

        if let Err(e) = self.send_with_retry(GateCommand::BuzzerOff).await {
            self.gate_fault(Direction::Entry, GateCommand::BuzzerOff, plate, &e)
                .await;
        }
    }

    /// Send with up to `command_attempts` tries and doubling backoff.
    pub async fn send_with_retry(&self, command: GateCommand) -> std::result::Result<(), LinkError> {
        let attempts = self.config.command_attempts;
        let mut last_error = None;

        for attempt in 1..=attempts {
            let backoff = self.config.backoff_before(attempt);
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }

            match self.link.send_command(command).await {
                Ok(()) => {
                    debug!(command = %command, attempt, "command sent");
                    return Ok(());
                }
                Err(e) => {
                    warn!(command = %command, attempt, attempts, error = %e, "command send failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LinkError::communication("no send attempted")))
    }

    /// The ledger already reflects the vehicle but the gate did not get its
    /// command. Not rolled back.
    async fn gate_fault(&self, gate: Direction, command: GateCommand, plate: &Plate, error: &LinkError) {
        error!(
            gate = %gate,
            command = %command,
            plate = %plate,
            error = %error,
            "gate command failed after retries, ledger and gate may disagree"
        );
        self.record(
            GateEvent::new(GateEventKind::GateFault, gate, self.clock.now())
                .with_plate(plate)
                .with_detail(format!("{command}: {error}")),
        )
        .await;
        self.emit(ControllerEvent::GateFault {
            gate,
            command,
            plate: Some(plate.clone()),
            message: error.to_string(),
        });
    }

    /// Drain pending slot notifications, announcing each one.
    pub fn poll_notifications(&self) -> Vec<Notification> {
        let notifications = self.link.poll_notifications();
        for notification in &notifications {
            info!(notification = %notification, "slot state changed");
            self.emit(ControllerEvent::SlotChanged {
                occupied: notification.occupied(),
                at: self.clock.now(),
            });
        }
        notifications
    }

    /// Best-effort: close both gates and silence the buzzer.
    pub async fn close_all(&self) {
        for command in [
            GateCommand::CloseEntry,
            GateCommand::CloseExit,
            GateCommand::BuzzerOff,
        ] {
            if let Err(e) = self.link.send_command(command).await {
                warn!(command = %command, error = %e, "shutdown command failed");
            }
        }
    }

    async fn record(&self, event: GateEvent) {
        let kind = event.kind;
        let ledger = self.ledger.lock().await;
        if let Err(e) = ledger.record_event(event).await {
            warn!(kind = %kind, error = %e, "failed to record gate event");
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // Only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

fn receipt_for(session: &ParkingSession, fee: Money) -> Receipt {
    let exit_time = session.exit_time.unwrap_or(session.entry_time);
    Receipt {
        plate: session.plate.clone(),
        slot_id: session.slot_id,
        entry_time: session.entry_time,
        exit_time,
        duration: format_duration(session.entry_time, exit_time),
        fee,
    }
}
