//! Login bootstrap endpoint.
//!
//! `POST /api/login` with a bearer token: verifies the credential, then
//! fetches-or-creates the user record and refreshes its login metadata.
//! Returns the record so clients can render approval state and quota usage.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tracing::info;

use pagelens_core::PageLensError;
use pagelens_store::ensure_user;

use crate::auth;
use crate::ocr_api::ApiError;
use crate::server::AppState;

/// `POST /api/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let auth_ctx = state.auth.as_ref().ok_or_else(|| {
        ApiError(PageLensError::Unauthorized("authentication is disabled".into()))
    })?;

    let token = auth::bearer_token(&headers)
        .ok_or_else(|| ApiError(PageLensError::Unauthorized("missing bearer token".into())))?;
    let identity = auth_ctx.verifier.verify(token).await?;
    let uid = identity.uid.clone();

    let record = ensure_user(auth_ctx.store.as_ref(), identity, Utc::now()).await?;
    info!(%uid, approved = record.is_premium, "login bootstrap completed");

    Ok(Json(json!({ "success": true, "user": record })))
}
