//! Recognizer configuration.
//!
//! ```yaml
//! recognizer:
//!   backend: cloud_vision
//!   api_key: "..."        # or AUTOPARK_VISION_API_KEY
//!   timeout_ms: 10000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cloud_vision::{CloudVisionRecognizer, DEFAULT_VISION_ENDPOINT, DEFAULT_VISION_TIMEOUT_MS};
use crate::devices::AnyRecognizer;
use crate::error::{RecognizeError, Result};
use crate::tesseract::{DEFAULT_TESSERACT_BINARY, DEFAULT_TESSERACT_TIMEOUT_MS, TesseractRecognizer};

/// Environment variable consulted when `api_key` is not set.
pub const VISION_API_KEY_ENV: &str = "AUTOPARK_VISION_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum RecognizerConfig {
    Tesseract {
        #[serde(default = "default_tesseract_binary")]
        binary: PathBuf,
        #[serde(default = "default_tesseract_timeout_ms")]
        timeout_ms: u64,
    },
    CloudVision {
        #[serde(default = "default_vision_endpoint")]
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_vision_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_tesseract_binary() -> PathBuf {
    PathBuf::from(DEFAULT_TESSERACT_BINARY)
}

fn default_tesseract_timeout_ms() -> u64 {
    DEFAULT_TESSERACT_TIMEOUT_MS
}

fn default_vision_endpoint() -> String {
    DEFAULT_VISION_ENDPOINT.to_string()
}

fn default_vision_timeout_ms() -> u64 {
    DEFAULT_VISION_TIMEOUT_MS
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self::Tesseract {
            binary: default_tesseract_binary(),
            timeout_ms: default_tesseract_timeout_ms(),
        }
    }
}

impl RecognizerConfig {
    /// Build the configured backend.
    ///
    /// # Errors
    /// Cloud Vision without an API key (in the file or the environment) is
    /// a configuration error.
    pub fn build(&self) -> Result<AnyRecognizer> {
        match self {
            Self::Tesseract { binary, timeout_ms } => {
                info!(binary = %binary.display(), "using tesseract recognizer");
                Ok(TesseractRecognizer::new(binary.clone(), Duration::from_millis(*timeout_ms)).into())
            }
            Self::CloudVision {
                endpoint,
                api_key,
                timeout_ms,
            } => {
                let key = api_key
                    .clone()
                    .filter(|k| !k.is_empty())
                    .or_else(|| std::env::var(VISION_API_KEY_ENV).ok())
                    .ok_or_else(|| {
                        RecognizeError::config(format!(
                            "cloud_vision needs api_key or {VISION_API_KEY_ENV}"
                        ))
                    })?;
                info!(endpoint = %endpoint, "using cloud vision recognizer");
                Ok(CloudVisionRecognizer::new(endpoint.clone(), key, Duration::from_millis(*timeout_ms))?.into())
            }
        }
    }
}
