//! Firestore REST client for the `users` collection.
//!
//! Keyed get / create / partial patch, authenticated with the shared Google
//! token source. Partial updates carry an `updateMask` so only changed fields
//! are written, and an exists precondition so a record deleted by an admin is
//! skipped silently instead of resurrected.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use pagelens_core::{PageLensError, UserPatch, UserRecord, UserStore};
use pagelens_gcp::TokenSource;

use crate::value::{encode_patch, encode_user, decode_user};

const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Client for one project's `(default)` Firestore database.
pub struct FirestoreClient {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    /// `{base}/projects/{project}/databases/(default)/documents`
    documents_url: String,
}

impl FirestoreClient {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenSource>, project_id: &str) -> Self {
        let documents_url = format!(
            "{FIRESTORE_URL}/projects/{project_id}/databases/(default)/documents"
        );
        Self { http, tokens, documents_url }
    }

    /// Override the documents URL, for tests against a local emulator.
    pub fn with_documents_url(mut self, documents_url: impl Into<String>) -> Self {
        self.documents_url = documents_url.into();
        self
    }

    fn user_url(&self, uid: &str) -> String {
        format!("{}/users/{uid}", self.documents_url)
    }

    async fn bearer(&self) -> Result<String, PageLensError> {
        self.tokens
            .access_token()
            .await
            .map_err(|err| PageLensError::Store(format!("token acquisition failed: {err}")))
    }
}

#[async_trait]
impl UserStore for FirestoreClient {
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, PageLensError> {
        let resp = self
            .http
            .get(self.user_url(uid))
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .map_err(|err| PageLensError::Store(format!("get failed: {err}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PageLensError::Store(format!("get returned {status}: {body}")));
        }

        let document: serde_json::Value = resp
            .json()
            .await
            .map_err(|err| PageLensError::Store(format!("malformed document: {err}")))?;
        decode_user(uid, &document).map(Some)
    }

    async fn create_user(&self, record: &UserRecord) -> Result<(), PageLensError> {
        let collection_url = format!("{}/users", self.documents_url);
        let resp = self
            .http
            .post(&collection_url)
            .query(&[("documentId", record.uid.as_str())])
            .bearer_auth(self.bearer().await?)
            .json(&encode_user(record))
            .send()
            .await
            .map_err(|err| PageLensError::Store(format!("create failed: {err}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PageLensError::Store(format!("create returned {status}: {body}")));
        }
        debug!(uid = %record.uid, "created user record");
        Ok(())
    }

    async fn update_fields(&self, uid: &str, patch: &UserPatch) -> Result<(), PageLensError> {
        if patch.is_empty() {
            return Ok(());
        }
        let (body, mask) = encode_patch(patch);
        let mut query: Vec<(&str, String)> = mask
            .into_iter()
            .map(|path| ("updateMask.fieldPaths", path))
            .collect();
        query.push(("currentDocument.exists", "true".to_string()));

        let resp = self
            .http
            .patch(self.user_url(uid))
            .query(&query)
            .bearer_auth(self.bearer().await?)
            .json(&body)
            .send()
            .await
            .map_err(|err| PageLensError::Store(format!("update failed: {err}")))?;

        // Record vanished between the gate's read and this write; skip.
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(uid, "skipping update for missing user record");
            return Ok(());
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PageLensError::Store(format!("update returned {status}: {body}")));
        }
        Ok(())
    }
}
