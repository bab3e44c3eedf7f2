//! Scripted recognizer for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use autopark_core::Plate;

use crate::error::{RecognizeError, Result};
use crate::traits::{PlateRecognizer, plate_from_text};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Failure(String),
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Reply>,
    calls: Vec<Vec<u8>>,
}

/// Recognizer that answers from a script.
///
/// Each call pops the next scripted reply; an empty script means
/// "no plate found". Every image passed in is recorded.
///
/// ```
/// use autopark_recognizer::{MockRecognizer, PlateRecognizer};
///
/// #[tokio::main]
/// async fn main() {
///     let (recognizer, handle) = MockRecognizer::new();
///     handle.push_text("ab12cde");
///
///     let plate = recognizer.recognize(b"crop").await.unwrap();
///     assert_eq!(plate.as_str(), "AB12CDE");
///     assert!(recognizer.recognize(b"crop").await.is_err());
///     assert_eq!(handle.calls().len(), 2);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    script: Arc<Mutex<Script>>,
}

impl MockRecognizer {
    pub fn new() -> (Self, MockRecognizerHandle) {
        let script = Arc::new(Mutex::new(Script::default()));
        (
            Self {
                script: Arc::clone(&script),
            },
            MockRecognizerHandle { script },
        )
    }
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PlateRecognizer for MockRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<Plate> {
        let reply = {
            let mut script = lock(&self.script);
            script.calls.push(image.to_vec());
            script.replies.pop_front()
        };

        match reply {
            Some(Reply::Text(text)) => plate_from_text(&text),
            Some(Reply::Failure(message)) => Err(RecognizeError::backend(message)),
            None => Err(RecognizeError::no_plate("")),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Handle for scripting a [`MockRecognizer`].
#[derive(Debug, Clone)]
pub struct MockRecognizerHandle {
    script: Arc<Mutex<Script>>,
}

impl MockRecognizerHandle {
    /// Next call reads this text (normalized like real OCR output).
    pub fn push_text(&self, text: impl Into<String>) {
        lock(&self.script).replies.push_back(Reply::Text(text.into()));
    }

    /// Next call finds no plate.
    pub fn push_no_plate(&self) {
        self.push_text("");
    }

    /// Next call fails with a backend error.
    pub fn push_failure(&self, message: impl Into<String>) {
        lock(&self.script)
            .replies
            .push_back(Reply::Failure(message.into()));
    }

    /// Images passed to `recognize`, in call order.
    pub fn calls(&self) -> Vec<Vec<u8>> {
        lock(&self.script).calls.clone()
    }
}
