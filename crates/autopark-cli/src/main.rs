mod config;
mod feed;
mod logging;
mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use autopark_controller::{Controller, ControllerHandle, start};
use autopark_core::Money;
use autopark_hardware::{detect_port, open_serial};
use autopark_storage::SessionLedger;

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(
    name = "autopark",
    about = "Automated car park controller: plate recognition, gates and billing",
    version
)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH, env = "AUTOPARK_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller, reading plate events from stdin
    Run {
        /// Serial port of the gate board (auto-detected if omitted)
        #[arg(long)]
        serial_port: Option<String>,

        /// Number of parking slots
        #[arg(long)]
        slots: Option<u32>,

        /// Rate per billing unit, e.g. "2.50"
        #[arg(long)]
        rate: Option<Money>,
    },

    /// List completed parking sessions, most recent first
    History {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// List vehicles currently parked
    Active,

    /// List recorded gate events, most recent first
    Events {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Print the serial port that would be auto-detected
    DetectPort,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config)?;

    if let Commands::Run {
        serial_port,
        slots,
        rate,
    } = &cli.command
    {
        if let Some(port) = serial_port {
            config.serial.port = Some(port.clone());
        }
        if let Some(slots) = slots {
            config.controller.capacity = *slots;
        }
        if let Some(rate) = rate {
            config.tariff.rate = *rate;
        }
    }
    config.validate()?;

    let _log_guard = logging::init_logging(&config.logging)?;
    if !cli.config.exists() {
        warn!(path = %cli.config.display(), "config file not found, using defaults");
    }

    match cli.command {
        Commands::Run { .. } => run(config).await,
        Commands::History { limit } => history(&config, limit).await,
        Commands::Active => active(&config).await,
        Commands::Events { limit } => events(&config, limit).await,
        Commands::DetectPort => {
            println!("{}", detect_port()?);
            Ok(())
        }
    }
}

async fn open_ledger(config: &AppConfig) -> Result<autopark_controller::Ledger> {
    let store = config.storage.open().await.context("opening session store")?;
    let tariff = config.tariff.tariff()?;
    Ok(SessionLedger::new(store, tariff))
}

async fn run(config: AppConfig) -> Result<()> {
    let link = open_serial(&config.serial.serial_config())
        .await
        .context("opening gate link")?;
    let recognizer = config.recognizer.build().context("building plate recognizer")?;
    let ledger = open_ledger(&config).await?;

    let controller = Controller::new(link.into(), recognizer, ledger, config.controller.clone())?;
    let handle = start(controller);

    let printer = tokio::spawn(print_events(handle.subscribe(), config.tariff.clone()));

    let lines = feed::spawn_stdin_reader()?;
    info!("reading plate events from stdin (entry|exit <image> [fallback])");
    tokio::select! {
        () = read_feed(lines, &handle) => {
            info!("event feed closed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
        }
    }

    handle.shutdown().await;
    if let Err(e) = printer.await {
        warn!(error = %e, "event printer panicked");
    }
    Ok(())
}

async fn read_feed(mut lines: mpsc::Receiver<String>, handle: &ControllerHandle) {
    while let Some(line) = lines.recv().await {
        let feed_line = match feed::parse_line(&line) {
            Ok(Some(feed_line)) => feed_line,
            Ok(None) => continue,
            Err(e) => {
                warn!(line = %line, error = %e, "skipping malformed feed line");
                continue;
            }
        };

        let event = match feed_line.load().await {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "skipping event");
                continue;
            }
        };

        if let Err(e) = handle.submit(event) {
            warn!(error = %e, "plate event not queued");
        }
    }
}

async fn print_events(
    mut events: tokio::sync::broadcast::Receiver<autopark_controller::ControllerEvent>,
    tariff: autopark_storage::TariffConfig,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(text) = report::event_line(&event, &tariff) {
                    println!("{text}");
                }
            }
            Err(RecvError::Lagged(missed)) => warn!(missed, "event printer fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn history(config: &AppConfig, limit: usize) -> Result<()> {
    let ledger = open_ledger(config).await?;
    let sessions = ledger.history(Some(limit)).await?;
    if sessions.is_empty() {
        println!("no completed sessions");
    }
    for session in &sessions {
        println!("{}", report::session_row(session, &config.tariff));
    }
    Ok(())
}

async fn active(config: &AppConfig) -> Result<()> {
    let ledger = open_ledger(config).await?;
    let capacity = config.controller.capacity;
    let sessions = ledger.active_sessions().await?;
    let free = ledger.available_slots(capacity).await?;

    println!("{} of {capacity} slots occupied, {} free", sessions.len(), free.len());
    for session in &sessions {
        println!("{}", report::session_row(session, &config.tariff));
    }
    Ok(())
}

async fn events(config: &AppConfig, limit: usize) -> Result<()> {
    let ledger = open_ledger(config).await?;
    for event in ledger.recent_events(Some(limit)).await? {
        println!("{}", report::gate_event_row(&event));
    }
    Ok(())
}
