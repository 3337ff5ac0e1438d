//! Sequential batch orchestration.
//!
//! One request per image, strictly in order, continue-on-error, no
//! concurrency and no cancellation. The aggregate succeeds when at least one
//! image did. Callers submit pages oldest-capture-first to approximate
//! physical page order; `sort_by_capture_time` does that sort.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use pagelens_core::{BatchOcrResult, OcrResponse};

/// One image queued for submission.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Capture time from the device, when known. Drives submission order.
    pub captured_at: Option<DateTime<Utc>>,
}

/// Anything that can submit one image and return the response envelope.
#[async_trait]
pub trait OcrSubmitter: Send + Sync {
    async fn submit(&self, image: &ImageUpload) -> OcrResponse;
}

/// Sort images by capture time ascending (oldest first). Images without a
/// capture time keep their relative order at the end.
pub fn sort_by_capture_time(images: &mut [ImageUpload]) {
    images.sort_by_key(|image| (image.captured_at.is_none(), image.captured_at));
}

/// Run the batch: N independent outcomes, submission order preserved.
pub async fn perform_batch_ocr<S: OcrSubmitter + ?Sized>(
    submitter: &S,
    images: &[ImageUpload],
) -> BatchOcrResult {
    let mut results = Vec::with_capacity(images.len());
    let mut total_success = 0;
    let mut total_failed = 0;

    for (index, image) in images.iter().enumerate() {
        debug!(index, filename = %image.filename, "submitting batch image");
        let response = submitter.submit(image).await;
        if response.success {
            total_success += 1;
        } else {
            total_failed += 1;
        }
        results.push(response);
    }

    BatchOcrResult {
        success: total_success > 0,
        results,
        total_processed: images.len(),
        total_success,
        total_failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelens_core::OcrData;

    struct ScriptedSubmitter;

    #[async_trait]
    impl OcrSubmitter for ScriptedSubmitter {
        async fn submit(&self, image: &ImageUpload) -> OcrResponse {
            if image.filename.starts_with("bad") {
                OcrResponse::err(format!("failed on {}", image.filename))
            } else {
                OcrResponse::ok(OcrData { text: image.filename.clone(), results: vec![] })
            }
        }
    }

    fn image(filename: &str, captured_at: Option<DateTime<Utc>>) -> ImageUpload {
        ImageUpload { filename: filename.into(), bytes: vec![0u8; 4], captured_at }
    }

    #[tokio::test]
    async fn mixed_batch_preserves_order_and_counts() {
        let images = vec![
            image("page-1.jpg", None),
            image("bad-2.jpg", None),
            image("page-3.jpg", None),
        ];
        let result = perform_batch_ocr(&ScriptedSubmitter, &images).await;

        assert!(result.success);
        assert_eq!(result.total_processed, 3);
        assert_eq!(result.total_success, 2);
        assert_eq!(result.total_failed, 1);
        assert_eq!(result.total_success + result.total_failed, result.total_processed);

        assert_eq!(result.results[0].data.as_ref().unwrap().text, "page-1.jpg");
        assert!(!result.results[1].success);
        assert_eq!(result.results[2].data.as_ref().unwrap().text, "page-3.jpg");
    }

    #[tokio::test]
    async fn all_failures_means_no_aggregate_success() {
        let images = vec![image("bad-1.jpg", None), image("bad-2.jpg", None)];
        let result = perform_batch_ocr(&ScriptedSubmitter, &images).await;
        assert!(!result.success);
        assert_eq!(result.total_failed, 2);
    }

    #[tokio::test]
    async fn empty_batch_is_a_failure_with_zero_counts() {
        let result = perform_batch_ocr(&ScriptedSubmitter, &[]).await;
        assert!(!result.success);
        assert_eq!(result.total_processed, 0);
    }

    #[test]
    fn capture_time_sort_is_oldest_first_with_unknowns_last() {
        let t = |secs: i64| DateTime::<Utc>::from_timestamp(secs, 0);
        let mut images = vec![
            image("c.jpg", t(300)),
            image("x.jpg", None),
            image("a.jpg", t(100)),
            image("b.jpg", t(200)),
        ];
        sort_by_capture_time(&mut images);
        let names: Vec<&str> = images.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg", "x.jpg"]);
    }
}
