//! In-process user store.
//!
//! Backs the gateway's tests and the auth-disabled local-development mode.
//! Same contract as the Firestore client, including the silent skip when a
//! patched record is missing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use pagelens_core::{PageLensError, UserPatch, UserRecord, UserStore};

#[derive(Default)]
pub struct MemoryUserStore {
    records: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, replacing any existing one. Test helper.
    pub async fn insert(&self, record: UserRecord) {
        self.records.write().await.insert(record.uid.clone(), record);
    }

    pub async fn remove(&self, uid: &str) {
        self.records.write().await.remove(uid);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, PageLensError> {
        Ok(self.records.read().await.get(uid).cloned())
    }

    async fn create_user(&self, record: &UserRecord) -> Result<(), PageLensError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.uid) {
            return Err(PageLensError::Store(format!(
                "record already exists for uid {}",
                record.uid
            )));
        }
        records.insert(record.uid.clone(), record.clone());
        Ok(())
    }

    async fn update_fields(&self, uid: &str, patch: &UserPatch) -> Result<(), PageLensError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(uid) {
            patch.apply_to(record);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pagelens_core::VerifiedIdentity;

    fn record(uid: &str) -> UserRecord {
        VerifiedIdentity {
            uid: uid.into(),
            email: format!("{uid}@example.com"),
            display_name: uid.into(),
            photo_url: None,
            email_verified: true,
            phone_number: None,
        }
        .into_new_record(Utc::now(), "2026-08-25".into())
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = MemoryUserStore::new();
        store.create_user(&record("u-1")).await.unwrap();
        let fetched = store.get_user("u-1").await.unwrap().unwrap();
        assert_eq!(fetched.email, "u-1@example.com");
        assert!(store.get_user("u-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_fails() {
        let store = MemoryUserStore::new();
        store.create_user(&record("u-1")).await.unwrap();
        assert!(store.create_user(&record("u-1")).await.is_err());
    }

    #[tokio::test]
    async fn patching_a_missing_record_is_a_silent_no_op() {
        let store = MemoryUserStore::new();
        let patch = UserPatch { daily_usage: Some(3), ..Default::default() };
        store.update_fields("ghost", &patch).await.unwrap();
        assert!(store.get_user("ghost").await.unwrap().is_none());
    }
}
