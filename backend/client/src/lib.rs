//! Client-side plumbing: the gateway API client and the sequential
//! continue-on-error batch runner.

pub mod api_client;
pub mod batch;

pub use api_client::ApiClient;
pub use batch::{perform_batch_ocr, sort_by_capture_time, ImageUpload, OcrSubmitter};
