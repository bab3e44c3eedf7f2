//! Remote OCR through a Cloud Vision `images:annotate` endpoint.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use autopark_core::Plate;

use crate::error::{RecognizeError, Result};
use crate::traits::{PlateRecognizer, plate_from_text};

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
pub const DEFAULT_VISION_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct CloudVisionRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl CloudVisionRecognizer {
    /// # Errors
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecognizeError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// JSON body for a single-image text detection request.
    pub fn request_body(image: &[u8]) -> serde_json::Value {
        json!({
            "requests": [{
                "image": { "content": BASE64.encode(image) },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        })
    }

    fn map_http_error(&self, error: reqwest::Error) -> RecognizeError {
        if error.is_timeout() {
            RecognizeError::timeout(self.timeout.as_millis() as u64)
        } else {
            RecognizeError::backend(format!("vision request failed: {error}"))
        }
    }
}

impl PlateRecognizer for CloudVisionRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<Plate> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&Self::request_body(image))
            .send()
            .await
            .map_err(|e| self.map_http_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognizeError::backend(format!(
                "vision endpoint returned {status}: {body}"
            )));
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| self.map_http_error(e))?;
        let text = first_annotation(parsed)?;

        debug!(raw = %text.trim(), "vision output");
        plate_from_text(&text)
    }

    fn name(&self) -> &'static str {
        "cloud_vision"
    }
}

#[derive(Debug, Deserialize)]
pub struct AnnotateResponse {
    #[serde(default)]
    pub responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,
    pub error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
pub struct TextAnnotation {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Pull the full-text annotation (the first one) out of a response.
///
/// # Errors
/// Per-image API errors become backend errors; a response without text
/// is [`RecognizeError::NoPlateFound`].
pub fn first_annotation(response: AnnotateResponse) -> Result<String> {
    let Some(image) = response.responses.into_iter().next() else {
        return Err(RecognizeError::no_plate(""));
    };

    if let Some(error) = image.error {
        return Err(RecognizeError::backend(format!(
            "vision error {}: {}",
            error.code, error.message
        )));
    }

    image
        .text_annotations
        .into_iter()
        .next()
        .map(|annotation| annotation.description)
        .ok_or_else(|| RecognizeError::no_plate(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> AnnotateResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = CloudVisionRecognizer::request_body(b"hi");
        assert_eq!(body["requests"][0]["image"]["content"], "aGk=");
        assert_eq!(body["requests"][0]["features"][0]["type"], "TEXT_DETECTION");
    }

    #[test]
    fn test_first_annotation_is_full_text() {
        let response = parse(
            r#"{"responses":[{"textAnnotations":[
                {"description":"MH 12 AB 1234\n","locale":"en"},
                {"description":"MH"}
            ]}]}"#,
        );
        let text = first_annotation(response).unwrap();
        assert_eq!(plate_from_text(&text).unwrap().as_str(), "MH12AB1234");
    }

    #[test]
    fn test_empty_response_is_no_plate() {
        let response = parse(r#"{"responses":[{}]}"#);
        assert!(matches!(
            first_annotation(response),
            Err(RecognizeError::NoPlateFound { .. })
        ));
        assert!(matches!(
            first_annotation(parse("{}")),
            Err(RecognizeError::NoPlateFound { .. })
        ));
    }

    #[test]
    fn test_api_error_is_backend_error() {
        let response = parse(
            r#"{"responses":[{"error":{"code":3,"message":"Bad image data."}}]}"#,
        );
        let err = first_annotation(response).unwrap_err();
        assert!(matches!(err, RecognizeError::Backend { .. }));
        assert!(err.to_string().contains("Bad image data."));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_backend_error() {
        let recognizer = CloudVisionRecognizer::new(
            "http://127.0.0.1:9/v1/images:annotate",
            "key",
            Duration::from_secs(2),
        )
        .unwrap();

        let result = recognizer.recognize(b"image").await;
        assert!(matches!(
            result,
            Err(RecognizeError::Backend { .. }) | Err(RecognizeError::Timeout { .. })
        ));
    }
}
