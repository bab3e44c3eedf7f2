//! Plate recognizer trait.

#![allow(async_fn_in_trait)]

use autopark_core::Plate;

use crate::error::{RecognizeError, Result};

/// Turns a plate-crop image into a normalized plate.
///
/// Backends return [`RecognizeError::NoPlateFound`] when they ran fine but
/// produced nothing that normalizes to a valid plate.
pub trait PlateRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<Plate>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Extract a plate from raw OCR text.
///
/// The whole text is tried first, then each line on its own, so a
/// multi-line read such as `"AB12 CDE\nSTATE"` still yields `AB12CDE`.
///
/// ```
/// use autopark_recognizer::plate_from_text;
///
/// assert_eq!(plate_from_text(" ab-12 cde\n").unwrap().as_str(), "AB12CDE");
/// assert_eq!(plate_from_text("KA 01 AB 1234\nINDIA").unwrap().as_str(), "KA01AB1234");
/// assert!(plate_from_text("~~").is_err());
/// ```
pub fn plate_from_text(text: &str) -> Result<Plate> {
    std::iter::once(text)
        .chain(text.lines())
        .find_map(|candidate| Plate::new(candidate).ok())
        .ok_or_else(|| RecognizeError::no_plate(text.trim()))
}
