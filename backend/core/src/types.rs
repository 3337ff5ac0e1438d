//! Wire and store types shared across the PageLens crates.
//!
//! Field names follow the original Firestore schema and the JSON contract of
//! the `/api/ocr` endpoint (camelCase, plus the legacy `is_premium` and
//! `photoURL` spellings), so serialized shapes stay byte-compatible with the
//! deployed clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user role in the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// One user record in the document store, keyed by the identity provider uid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub phone_number: Option<String>,

    /// Approval flag, set externally by an administrator. Read-only here.
    #[serde(rename = "is_premium")]
    pub is_premium: bool,

    /// Requests admitted on `last_usage_date`. Stale once the date rolls over.
    pub daily_usage: u32,
    /// ISO calendar date (`YYYY-MM-DD`, UTC) of the last admitted request.
    pub last_usage_date: String,
    /// Lifetime admitted requests. Monotonic non-decreasing.
    pub total_usage: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    pub is_active: bool,
    pub role: Role,
}

/// Identity resolved from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub phone_number: Option<String>,
}

impl VerifiedIdentity {
    /// Build a fresh store record for a first-time login.
    pub fn into_new_record(self, now: DateTime<Utc>, today: String) -> UserRecord {
        UserRecord {
            uid: self.uid,
            email: self.email,
            display_name: self.display_name,
            photo_url: self.photo_url,
            email_verified: self.email_verified,
            phone_number: self.phone_number,
            is_premium: false,
            daily_usage: 0,
            last_usage_date: today,
            total_usage: 0,
            created_at: now,
            updated_at: now,
            last_login_at: now,
            is_active: true,
            role: Role::User,
        }
    }
}

/// Partial update of a user record. Only set fields are persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: Option<bool>,
    pub daily_usage: Option<u32>,
    pub last_usage_date: Option<String>,
    pub total_usage: Option<u64>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserPatch {
    /// Apply the set fields to an in-memory record.
    pub fn apply_to(&self, record: &mut UserRecord) {
        if let Some(v) = &self.display_name {
            record.display_name = v.clone();
        }
        if let Some(v) = &self.photo_url {
            record.photo_url = Some(v.clone());
        }
        if let Some(v) = self.email_verified {
            record.email_verified = v;
        }
        if let Some(v) = self.daily_usage {
            record.daily_usage = v;
        }
        if let Some(v) = &self.last_usage_date {
            record.last_usage_date = v.clone();
        }
        if let Some(v) = self.total_usage {
            record.total_usage = v;
        }
        if let Some(v) = self.updated_at {
            record.updated_at = v;
        }
        if let Some(v) = self.last_login_at {
            record.last_login_at = v;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Axis-aligned box derived from the engine's bounding polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One detected text region, excluding the whole-image detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrFragment {
    pub text: String,
    /// Synthetic estimate in [0.70, 0.95]; the engine provides none.
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

/// Normalized extraction result: whole-image text plus per-region fragments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrData {
    pub text: String,
    pub results: Vec<OcrFragment>,
}

/// The `/api/ocr` response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<OcrData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OcrResponse {
    pub fn ok(data: OcrData) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()) }
    }
}

/// Aggregate outcome of a sequential batch run, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOcrResult {
    /// True when at least one image succeeded.
    pub success: bool,
    pub results: Vec<OcrResponse>,
    pub total_processed: usize,
    pub total_success: usize,
    pub total_failed: usize,
}
