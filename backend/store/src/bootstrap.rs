//! Login bootstrap for user records.
//!
//! On every successful authentication: refresh an existing record's login
//! metadata, or create a fresh record for a first-time user. New records
//! start unapproved with zeroed usage counters.

use chrono::{DateTime, Utc};
use tracing::info;

use pagelens_core::{PageLensError, UserPatch, UserRecord, UserStore, VerifiedIdentity};

/// Fetch-or-create the record for a verified identity.
pub async fn ensure_user(
    store: &dyn UserStore,
    identity: VerifiedIdentity,
    now: DateTime<Utc>,
) -> Result<UserRecord, PageLensError> {
    match store.get_user(&identity.uid).await? {
        Some(mut record) => {
            let patch = UserPatch {
                display_name: Some(identity.display_name),
                photo_url: identity.photo_url,
                email_verified: Some(identity.email_verified),
                updated_at: Some(now),
                last_login_at: Some(now),
                ..Default::default()
            };
            store.update_fields(&record.uid, &patch).await?;
            patch.apply_to(&mut record);
            Ok(record)
        }
        None => {
            let today = now.format("%Y-%m-%d").to_string();
            let record = identity.into_new_record(now, today);
            store.create_user(&record).await?;
            info!(uid = %record.uid, "created user record on first login");
            Ok(record)
        }
    }
}
