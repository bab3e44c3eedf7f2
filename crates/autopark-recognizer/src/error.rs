/// Result type alias for recognition.
pub type Result<T> = std::result::Result<T, RecognizeError>;

/// Why a plate could not be read.
#[derive(Debug, thiserror::Error)]
pub enum RecognizeError {
    /// The backend answered but no valid plate was in the text.
    #[error("No plate found (read {raw:?})")]
    NoPlateFound { raw: String },

    /// The backend did not answer in time.
    #[error("Recognition timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The backend failed (process error, HTTP error, bad response).
    #[error("Recognizer backend error: {message}")]
    Backend { message: String },

    /// Invalid recognizer configuration.
    #[error("Recognizer configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecognizeError {
    pub fn no_plate(raw: impl Into<String>) -> Self {
        Self::NoPlateFound { raw: raw.into() }
    }

    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
