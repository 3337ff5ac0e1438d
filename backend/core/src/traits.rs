//! Service traits at the seams of the gateway.
//!
//! Each external collaborator (identity provider, document store, recognition
//! engine) is consumed through one of these traits so the orchestrator can be
//! exercised with in-process fakes.

use async_trait::async_trait;

use crate::error::PageLensError;
use crate::types::{OcrData, UserPatch, UserRecord, VerifiedIdentity};

/// Resolves an opaque bearer token to a stable identity, or rejects it.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, PageLensError>;
}

/// Keyed access to user records in the document store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a record by uid. `Ok(None)` when no record exists.
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, PageLensError>;

    /// Create a record. Fails if one already exists for the uid.
    async fn create_user(&self, record: &UserRecord) -> Result<(), PageLensError>;

    /// Persist only the set fields of `patch`. A missing record is a no-op,
    /// not an error (best-effort semantics of the usage recorder).
    async fn update_fields(&self, uid: &str, patch: &UserPatch) -> Result<(), PageLensError>;
}

/// Submits image bytes to the recognition engine and normalizes the result.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn extract(&self, image: &[u8]) -> Result<OcrData, PageLensError>;
}
