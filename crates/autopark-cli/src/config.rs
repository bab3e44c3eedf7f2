//! Application configuration file.
//!
//! Every section has defaults, so an empty file (or no file at all) gives a
//! working single-slot setup on an auto-detected serial port. See
//! `config/autopark.example.yaml` for the full layout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use autopark_controller::ControllerConfig;
use autopark_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_OPEN_SETTLE_MS, DEFAULT_WRITE_TIMEOUT_MS};
use autopark_hardware::SerialConfig;
use autopark_recognizer::RecognizerConfig;
use autopark_storage::{StorageConfig, TariffConfig};

pub const DEFAULT_CONFIG_PATH: &str = "autopark.yaml";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialSection,
    pub controller: ControllerConfig,
    pub tariff: TariffConfig,
    pub recognizer: RecognizerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSection {
    /// Device path; auto-detected when absent.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub write_timeout_ms: u64,
    pub open_settle_ms: u64,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            open_settle_ms: DEFAULT_OPEN_SETTLE_MS,
        }
    }
}

impl SerialSection {
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            open_settle: Duration::from_millis(self.open_settle_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level, overridden by `RUST_LOG`.
    pub level: String,
    /// Also append logs to this file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl AppConfig {
    /// Parse a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // serde_yaml rejects an empty document as a struct
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load `path`, falling back to defaults when it does not exist.
    ///
    /// A file that exists but cannot be parsed is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn validate(&self) -> Result<()> {
        self.controller
            .validate()
            .context("invalid controller section")?;
        self.tariff.tariff().context("invalid tariff section")?;
        if self.serial.baud_rate == 0 {
            anyhow::bail!("invalid serial section: baud_rate must be positive");
        }
        Ok(())
    }
}
