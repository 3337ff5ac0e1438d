//! HTTP client for the gateway's OCR endpoint.
//!
//! Explicitly constructed with a base URL and optional bearer token; one
//! instance is built at startup and passed around by reference. A transport
//! or decode failure is folded into the `{success:false}` envelope so a
//! batch run never aborts on a single bad request.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::warn;

use pagelens_core::OcrResponse;

use crate::batch::{ImageUpload, OcrSubmitter};

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http, base_url, bearer_token: None }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Submit one image to `/api/ocr`. Failures become error envelopes.
    pub async fn perform_ocr(&self, image: &ImageUpload) -> OcrResponse {
        match self.try_perform_ocr(image).await {
            Ok(response) => response,
            Err(err) => {
                warn!(filename = %image.filename, error = %err, "ocr request failed");
                OcrResponse::err(err.to_string())
            }
        }
    }

    async fn try_perform_ocr(&self, image: &ImageUpload) -> Result<OcrResponse, reqwest::Error> {
        let part = Part::bytes(image.bytes.clone()).file_name(image.filename.clone());
        let form = Form::new().part("image", part);

        let mut request = self
            .http
            .post(format!("{}/api/ocr", self.base_url))
            .multipart(form);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        // Non-2xx responses still carry the envelope; decode rather than fail.
        request.send().await?.json().await
    }
}

#[async_trait]
impl OcrSubmitter for ApiClient {
    async fn submit(&self, image: &ImageUpload) -> OcrResponse {
        self.perform_ocr(image).await
    }
}
