//! Enum wrapper for recognizer dispatch.

use autopark_core::Plate;

use crate::Result;
use crate::cloud_vision::CloudVisionRecognizer;
use crate::mock::MockRecognizer;
use crate::tesseract::TesseractRecognizer;
use crate::traits::PlateRecognizer;

/// Any recognizer backend, chosen at startup from configuration.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyRecognizer {
    Tesseract(TesseractRecognizer),
    CloudVision(CloudVisionRecognizer),
    Mock(MockRecognizer),
}

impl PlateRecognizer for AnyRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<Plate> {
        match self {
            Self::Tesseract(r) => r.recognize(image).await,
            Self::CloudVision(r) => r.recognize(image).await,
            Self::Mock(r) => r.recognize(image).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Tesseract(r) => r.name(),
            Self::CloudVision(r) => r.name(),
            Self::Mock(r) => r.name(),
        }
    }
}

impl From<TesseractRecognizer> for AnyRecognizer {
    fn from(r: TesseractRecognizer) -> Self {
        Self::Tesseract(r)
    }
}

impl From<CloudVisionRecognizer> for AnyRecognizer {
    fn from(r: CloudVisionRecognizer) -> Self {
        Self::CloudVision(r)
    }
}

impl From<MockRecognizer> for AnyRecognizer {
    fn from(r: MockRecognizer) -> Self {
        Self::Mock(r)
    }
}
