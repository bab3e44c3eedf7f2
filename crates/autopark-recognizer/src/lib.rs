//! Plate recognition backends.
//!
//! [`PlateRecognizer`] turns a plate-crop image into a [`Plate`](autopark_core::Plate).
//! The controller never branches on the backend: it holds an
//! [`AnyRecognizer`] built from [`RecognizerConfig`].

pub mod cloud_vision;
pub mod config;
pub mod devices;
pub mod error;
pub mod mock;
pub mod tesseract;
pub mod traits;

pub use cloud_vision::CloudVisionRecognizer;
pub use config::RecognizerConfig;
pub use devices::AnyRecognizer;
pub use error::{RecognizeError, Result};
pub use mock::{MockRecognizer, MockRecognizerHandle};
pub use tesseract::TesseractRecognizer;
pub use traits::{PlateRecognizer, plate_from_text};
