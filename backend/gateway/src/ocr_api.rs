//! The OCR endpoint: authenticate → authorize → extract → record.
//!
//! One image per request, multipart field `image`. A missing image
//! short-circuits before any network call. Recording failures are logged and
//! never surfaced: the user's extraction already succeeded.

use std::sync::Arc;

use axum::extract::multipart::Multipart;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, info, warn};
use uuid::Uuid;

use pagelens_core::{OcrData, OcrResponse, PageLensError};

use crate::gate::{self, Admission};
use crate::recorder;
use crate::server::AppState;
use crate::auth;

/// Error wrapper mapping the domain taxonomy onto HTTP statuses. The body
/// keeps the original `{success:false, error}` envelope for every class.
pub struct ApiError(pub PageLensError);

impl From<PageLensError> for ApiError {
    fn from(err: PageLensError) -> Self {
        Self(err)
    }
}

pub(crate) fn status_for(err: &PageLensError) -> StatusCode {
    match err {
        PageLensError::Validation(_) => StatusCode::BAD_REQUEST,
        PageLensError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        PageLensError::UserNotFound(_) | PageLensError::PendingApproval => StatusCode::FORBIDDEN,
        PageLensError::DailyLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        PageLensError::Engine(_) | PageLensError::Store(_) | PageLensError::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if self.0.is_client_fault() {
            warn!(error = %self.0, "request rejected");
        } else {
            error!(error = %self.0, "request failed");
        }
        (status, Json(OcrResponse::err(self.0.to_string()))).into_response()
    }
}

/// `POST /api/ocr`
pub async fn annotate_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<OcrResponse>, ApiError> {
    let request_id = Uuid::new_v4();

    let image = read_image_field(multipart).await?.ok_or_else(|| {
        ApiError(PageLensError::Validation("no image file provided".into()))
    })?;
    info!(%request_id, size_bytes = image.len(), "ocr request received");

    let token = auth::bearer_token(&headers);
    let data = process_image(&state, token, &image, request_id).await?;
    info!(%request_id, fragments = data.results.len(), "ocr request completed");
    Ok(Json(OcrResponse::ok(data)))
}

/// Pull the `image` field's bytes out of the multipart body. Unknown fields
/// are ignored; malformed or oversized bodies map to a validation error.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<Vec<u8>>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError(PageLensError::Validation(format!("malformed upload: {err}"))))?
    {
        if field.name() == Some("image") {
            let bytes = field.bytes().await.map_err(|err| {
                ApiError(PageLensError::Validation(format!("failed to read image: {err}")))
            })?;
            return Ok(Some(bytes.to_vec()));
        }
    }
    Ok(None)
}

/// The per-request state machine, multipart parsing already done:
/// authenticate, authorize, extract, record. With auth disabled the request
/// goes straight to extraction.
pub async fn process_image(
    state: &AppState,
    bearer: Option<&str>,
    image: &[u8],
    request_id: Uuid,
) -> Result<OcrData, PageLensError> {
    let Some(auth) = &state.auth else {
        return state.recognizer.extract(image).await;
    };

    let token = bearer
        .ok_or_else(|| PageLensError::Unauthorized("missing bearer token".into()))?;
    let identity = auth.verifier.verify(token).await?;

    let record = auth
        .store
        .get_user(&identity.uid)
        .await?
        .ok_or_else(|| PageLensError::UserNotFound(identity.uid.clone()))?;

    let today = gate::today_utc();
    if let Admission::Deny(reason) = gate::admit(&record, &today) {
        return Err(reason.into());
    }

    let data = state.recognizer.extract(image).await?;

    // Best-effort: a bookkeeping failure must not fail the extraction the
    // user already paid for, but it must be visible in the logs.
    if let Err(err) = recorder::record_usage(auth.store.as_ref(), &identity.uid, &today).await {
        error!(%request_id, uid = %identity.uid, error = %err, "usage recording failed");
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use pagelens_core::{
        OcrFragment, TextRecognizer, TokenVerifier, UserPatch, UserRecord, UserStore,
        VerifiedIdentity,
    };
    use pagelens_store::MemoryUserStore;

    use crate::gate::{today_utc, DAILY_LIMIT};
    use crate::server::AuthContext;

    struct StubVerifier;

    #[async_trait]
    impl TokenVerifier for StubVerifier {
        async fn verify(&self, token: &str) -> Result<VerifiedIdentity, PageLensError> {
            match token.strip_prefix("token-for-") {
                Some(uid) => Ok(VerifiedIdentity {
                    uid: uid.into(),
                    email: format!("{uid}@example.com"),
                    display_name: uid.into(),
                    photo_url: None,
                    email_verified: true,
                    phone_number: None,
                }),
                None => Err(PageLensError::Unauthorized("invalid token".into())),
            }
        }
    }

    struct StubRecognizer {
        calls: AtomicUsize,
        outcome: Result<OcrData, String>,
    }

    impl StubRecognizer {
        fn succeeding() -> Self {
            let data = OcrData {
                text: "full page".into(),
                results: vec![OcrFragment {
                    text: "full".into(),
                    confidence: 0.74,
                    bounding_box: None,
                }],
            };
            Self { calls: AtomicUsize::new(0), outcome: Ok(data) }
        }

        fn failing(message: &str) -> Self {
            Self { calls: AtomicUsize::new(0), outcome: Err(message.into()) }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextRecognizer for StubRecognizer {
        async fn extract(&self, _image: &[u8]) -> Result<OcrData, PageLensError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone().map_err(PageLensError::Engine)
        }
    }

    /// Store whose writes always fail; reads pass through.
    struct BrokenWriteStore(MemoryUserStore);

    #[async_trait]
    impl UserStore for BrokenWriteStore {
        async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, PageLensError> {
            self.0.get_user(uid).await
        }
        async fn create_user(&self, record: &UserRecord) -> Result<(), PageLensError> {
            self.0.create_user(record).await
        }
        async fn update_fields(&self, _: &str, _: &UserPatch) -> Result<(), PageLensError> {
            Err(PageLensError::Store("write refused".into()))
        }
    }

    fn approved_record(uid: &str, daily_usage: u32, last_usage_date: &str) -> UserRecord {
        let mut record = VerifiedIdentity {
            uid: uid.into(),
            email: format!("{uid}@example.com"),
            display_name: uid.into(),
            photo_url: None,
            email_verified: true,
            phone_number: None,
        }
        .into_new_record(Utc::now(), last_usage_date.into());
        record.is_premium = true;
        record.daily_usage = daily_usage;
        record
    }

    fn state_with(
        store: Arc<dyn UserStore>,
        recognizer: Arc<StubRecognizer>,
    ) -> (AppState, Arc<StubRecognizer>) {
        let state = AppState {
            recognizer: recognizer.clone(),
            auth: Some(AuthContext { verifier: Arc::new(StubVerifier), store }),
        };
        (state, recognizer)
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized_before_extraction() {
        let store = Arc::new(MemoryUserStore::new());
        let (state, recognizer) = state_with(store, Arc::new(StubRecognizer::succeeding()));

        let err = process_image(&state, None, b"img", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PageLensError::Unauthorized(_)));
        assert_eq!(recognizer.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let store = Arc::new(MemoryUserStore::new());
        let (state, recognizer) = state_with(store, Arc::new(StubRecognizer::succeeding()));

        let err = process_image(&state, Some("token-for-ghost"), b"img", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, PageLensError::UserNotFound(_)));
        assert_eq!(recognizer.call_count(), 0);
    }

    #[tokio::test]
    async fn unapproved_user_is_rejected() {
        let store = Arc::new(MemoryUserStore::new());
        let mut record = approved_record("u-1", 0, &today_utc());
        record.is_premium = false;
        store.insert(record).await;
        let (state, recognizer) = state_with(store, Arc::new(StubRecognizer::succeeding()));

        let err = process_image(&state, Some("token-for-u-1"), b"img", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, PageLensError::PendingApproval));
        assert_eq!(recognizer.call_count(), 0);
    }

    #[tokio::test]
    async fn quota_exhausted_today_never_reaches_the_engine() {
        let store = Arc::new(MemoryUserStore::new());
        store.insert(approved_record("u-1", DAILY_LIMIT, &today_utc())).await;
        let (state, recognizer) = state_with(store, Arc::new(StubRecognizer::succeeding()));

        let err = process_image(&state, Some("token-for-u-1"), b"img", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, PageLensError::DailyLimitExceeded { used: 50, limit: 50 }));
        assert_eq!(recognizer.call_count(), 0);
    }

    #[tokio::test]
    async fn success_extracts_and_records_usage() {
        let store = Arc::new(MemoryUserStore::new());
        store.insert(approved_record("u-1", 2, &today_utc())).await;
        let (state, recognizer) =
            state_with(store.clone(), Arc::new(StubRecognizer::succeeding()));

        let data = process_image(&state, Some("token-for-u-1"), b"img", Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(data.text, "full page");
        assert_eq!(recognizer.call_count(), 1);

        let record = store.get_user("u-1").await.unwrap().unwrap();
        assert_eq!(record.daily_usage, 3);
        assert_eq!(record.total_usage, 1);
    }

    #[tokio::test]
    async fn stale_date_admits_and_resets_counter_to_one() {
        let store = Arc::new(MemoryUserStore::new());
        store.insert(approved_record("u-1", DAILY_LIMIT, "2020-01-01")).await;
        let (state, _) = state_with(store.clone(), Arc::new(StubRecognizer::succeeding()));

        process_image(&state, Some("token-for-u-1"), b"img", Uuid::new_v4())
            .await
            .unwrap();

        let record = store.get_user("u-1").await.unwrap().unwrap();
        assert_eq!(record.daily_usage, 1);
        assert_eq!(record.last_usage_date, today_utc());
    }

    #[tokio::test]
    async fn engine_failure_is_surfaced_and_nothing_is_recorded() {
        let store = Arc::new(MemoryUserStore::new());
        store.insert(approved_record("u-1", 5, &today_utc())).await;
        let (state, _) =
            state_with(store.clone(), Arc::new(StubRecognizer::failing("engine down")));

        let err = process_image(&state, Some("token-for-u-1"), b"img", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, PageLensError::Engine(_)));

        let record = store.get_user("u-1").await.unwrap().unwrap();
        assert_eq!(record.daily_usage, 5);
    }

    #[tokio::test]
    async fn recording_failure_does_not_fail_the_response() {
        let inner = MemoryUserStore::new();
        inner.insert(approved_record("u-1", 5, &today_utc())).await;
        let store: Arc<dyn UserStore> = Arc::new(BrokenWriteStore(inner));
        let (state, _) = state_with(store, Arc::new(StubRecognizer::succeeding()));

        let data = process_image(&state, Some("token-for-u-1"), b"img", Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(data.text, "full page");
    }

    #[tokio::test]
    async fn auth_disabled_goes_straight_to_extraction() {
        let recognizer = Arc::new(StubRecognizer::succeeding());
        let state = AppState { recognizer: recognizer.clone(), auth: None };

        let data = process_image(&state, None, b"img", Uuid::new_v4()).await.unwrap();
        assert_eq!(data.results.len(), 1);
        assert_eq!(recognizer.call_count(), 1);
    }

    #[tokio::test]
    async fn multipart_without_image_field_is_400_and_never_reaches_the_engine() {
        let recognizer = Arc::new(StubRecognizer::succeeding());
        let state = Arc::new(AppState { recognizer: recognizer.clone(), auth: None });
        let app = crate::server::build_router(state);

        let boundary = "pagelens-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\r\n\
             not an image\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/ocr")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let envelope: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"], "no image file provided");
        assert_eq!(recognizer.call_count(), 0);
    }

    #[test]
    fn status_mapping_follows_the_error_class() {
        assert_eq!(status_for(&PageLensError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&PageLensError::Unauthorized("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_for(&PageLensError::PendingApproval), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(&PageLensError::UserNotFound("u".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&PageLensError::DailyLimitExceeded { used: 50, limit: 50 }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(&PageLensError::Engine("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
