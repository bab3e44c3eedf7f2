//! Local OCR through the `tesseract` executable.
//!
//! The image is piped to `tesseract stdin stdout` in single-line mode with
//! an uppercase alphanumeric whitelist; whatever comes back on stdout goes
//! through [`plate_from_text`].

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use autopark_core::Plate;

use crate::error::{RecognizeError, Result};
use crate::traits::{PlateRecognizer, plate_from_text};

pub const DEFAULT_TESSERACT_BINARY: &str = "tesseract";
pub const DEFAULT_TESSERACT_TIMEOUT_MS: u64 = 5_000;

const CHAR_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    timeout: Duration,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Arguments passed after the binary name.
    pub fn args() -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "--oem".to_string(),
            "3".to_string(),
            "--psm".to_string(),
            "7".to_string(),
            "-c".to_string(),
            format!("tessedit_char_whitelist={CHAR_WHITELIST}"),
        ]
    }

    async fn run(&self, image: &[u8]) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .args(Self::args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RecognizeError::backend(format!(
                    "failed to spawn {}: {e}",
                    self.binary.display()
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(image).await {
                Ok(()) => {}
                // The process may exit before reading everything.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    trace!("tesseract closed stdin early");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognizeError::backend(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_TESSERACT_BINARY,
            Duration::from_millis(DEFAULT_TESSERACT_TIMEOUT_MS),
        )
    }
}

impl PlateRecognizer for TesseractRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<Plate> {
        let text = tokio::time::timeout(self.timeout, self.run(image))
            .await
            .map_err(|_| RecognizeError::timeout(self.timeout.as_millis() as u64))??;

        debug!(raw = %text.trim(), "tesseract output");
        plate_from_text(&text)
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}
