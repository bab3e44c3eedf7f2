//! Worker tasks and the handle that feeds them.
//!
//! [`start`] spawns one worker per gate, each draining its own bounded
//! queue one event at a time, plus a poller that drains slot notifications
//! every `poll_interval`. Entry and exit run in parallel; events for one
//! gate never overlap.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use autopark_core::Direction;
use autopark_hardware::GateLink;

use crate::controller::Controller;
use crate::error::{ControllerError, Result};
use crate::events::{ControllerEvent, PlateEvent};
use crate::state_machine::GateCycle;

/// Handle to a running controller.
#[derive(Debug)]
pub struct ControllerHandle {
    controller: Arc<Controller>,
    entry_tx: mpsc::Sender<PlateEvent>,
    exit_tx: mpsc::Sender<PlateEvent>,
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
    poller: JoinHandle<()>,
}

/// Spawn the gate workers and the notification poller.
///
/// Must be called from within a Tokio runtime.
pub fn start(controller: Controller) -> ControllerHandle {
    let controller = Arc::new(controller);
    let depth = controller.config().event_queue_depth;

    let (entry_tx, entry_rx) = mpsc::channel(depth);
    let (exit_tx, exit_rx) = mpsc::channel(depth);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let workers = vec![
        tokio::spawn(run_worker(Arc::clone(&controller), Direction::Entry, entry_rx)),
        tokio::spawn(run_worker(Arc::clone(&controller), Direction::Exit, exit_rx)),
    ];
    let poller = tokio::spawn(run_poller(Arc::clone(&controller), shutdown_rx));

    info!(
        capacity = controller.config().capacity,
        queue_depth = depth,
        "controller started"
    );

    ControllerHandle {
        controller,
        entry_tx,
        exit_tx,
        shutdown_tx,
        workers,
        poller,
    }
}

impl ControllerHandle {
    /// Queue a plate event for its gate.
    ///
    /// # Errors
    /// [`ControllerError::QueueFull`] if the gate is busy and its queue is
    /// full; the event is dropped.
    pub fn submit(&self, event: PlateEvent) -> Result<()> {
        let gate = event.direction;
        let tx = match gate {
            Direction::Entry => &self.entry_tx,
            Direction::Exit => &self.exit_tx,
        };

        match tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(gate = %gate, "gate busy, dropping plate event");
                Err(ControllerError::QueueFull { gate })
            }
            Err(TrySendError::Closed(_)) => Err(ControllerError::ShuttingDown),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.controller.subscribe()
    }

    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    /// Stop accepting events, let running workflows finish, stop the
    /// poller, then close both gates and silence the buzzer.
    pub async fn shutdown(self) {
        let Self {
            controller,
            entry_tx,
            exit_tx,
            shutdown_tx,
            workers,
            poller,
        } = self;

        info!("controller shutting down");
        drop(entry_tx);
        drop(exit_tx);

        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "gate worker panicked");
            }
        }

        let _ = shutdown_tx.send(true);
        if let Err(e) = poller.await {
            error!(error = %e, "poller panicked");
        }

        controller.close_all().await;
        info!("controller stopped");
    }
}

async fn run_worker(controller: Arc<Controller>, gate: Direction, mut rx: mpsc::Receiver<PlateEvent>) {
    let mut cycle = GateCycle::new(gate);
    debug!(gate = %gate, "gate worker started");

    while let Some(event) = rx.recv().await {
        match controller.handle_event(&mut cycle, event).await {
            Ok(outcome) => debug!(gate = %gate, ?outcome, "plate event handled"),
            Err(e) => error!(gate = %gate, error = %e, "plate event not serviced"),
        }
    }

    debug!(gate = %gate, "gate worker stopped");
}

async fn run_poller(controller: Arc<Controller>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(controller.config().poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut connected = controller.link().is_connected();

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                controller.poll_notifications();

                let now_connected = controller.link().is_connected();
                if now_connected != connected {
                    if now_connected {
                        info!("gate link reconnected");
                    } else {
                        error!("gate link lost, commands will fail");
                    }
                    connected = now_connected;
                }
            }
        }
    }

    debug!("poller stopped");
}
