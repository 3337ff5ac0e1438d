//! Google Cloud Vision client.
//!
//! Submits one image per call to `images:annotate` requesting text detection.
//! No retries: the engine's answer (or failure) is surfaced directly.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use tracing::{debug, warn};

use pagelens_core::{OcrData, PageLensError, TextRecognizer};
use pagelens_gcp::TokenSource;

use crate::normalize::{normalize, TextAnnotation};

const ANNOTATE_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

pub struct VisionClient {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    endpoint: String,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    error: Option<EngineStatus>,
}

#[derive(Deserialize)]
struct EngineStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl VisionClient {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenSource>) -> Self {
        Self { http, tokens, endpoint: ANNOTATE_URL.to_string() }
    }

    /// Override the endpoint, for tests against a local server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TextRecognizer for VisionClient {
    async fn extract(&self, image: &[u8]) -> Result<OcrData, PageLensError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|err| PageLensError::Engine(format!("engine credentials: {err}")))?;

        let body = serde_json::json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image) },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|err| PageLensError::Engine(format!("annotate request failed: {err}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, "recognition engine rejected the request");
            return Err(PageLensError::Engine(format!("engine returned {status}: {text}")));
        }

        let annotate: AnnotateResponse = resp
            .json()
            .await
            .map_err(|err| PageLensError::Engine(format!("malformed engine response: {err}")))?;

        let image_response = annotate
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| PageLensError::Engine("engine returned no responses".into()))?;

        if let Some(status) = image_response.error {
            return Err(PageLensError::Engine(format!(
                "engine error {}: {}",
                status.code, status.message
            )));
        }

        debug!(detections = image_response.text_annotations.len(), "engine detections received");
        Ok(normalize(&image_response.text_annotations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotate_response_parses_detections_and_polygons() {
        let raw = serde_json::json!({
            "responses": [{
                "textAnnotations": [
                    { "description": "책 한 페이지", "boundingPoly": { "vertices": [
                        { "x": 0, "y": 0 }, { "x": 400 }, { "x": 400, "y": 600 }, { "y": 600 }
                    ]}},
                    { "description": "책", "boundingPoly": { "vertices": [
                        { "x": 10, "y": 20 }, { "x": 50, "y": 20 },
                        { "x": 50, "y": 60 }, { "x": 10, "y": 60 }
                    ]}}
                ]
            }]
        });
        let parsed: AnnotateResponse = serde_json::from_value(raw).unwrap();
        let data = normalize(&parsed.responses[0].text_annotations);
        assert_eq!(data.text, "책 한 페이지");
        assert_eq!(data.results.len(), 1);
        let frag = &data.results[0];
        assert_eq!(frag.text, "책");
        let bbox = frag.bounding_box.unwrap();
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (10, 20, 40, 40));
    }

    #[test]
    fn per_image_error_is_parsed() {
        let raw = serde_json::json!({
            "responses": [{ "error": { "code": 7, "message": "permission denied" } }]
        });
        let parsed: AnnotateResponse = serde_json::from_value(raw).unwrap();
        let error = parsed.responses[0].error.as_ref().unwrap();
        assert_eq!(error.code, 7);
        assert_eq!(error.message, "permission denied");
    }
}
