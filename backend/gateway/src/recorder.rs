//! Usage Recorder: post-success quota bookkeeping.
//!
//! Re-fetches the record, advances (or resets) the daily counter, bumps the
//! lifetime total, and persists a partial patch. A record missing at this
//! point is skipped without error. The caller decides what to do with a
//! persistence failure; the user-visible OCR result must never depend on it.

use chrono::Utc;
use tracing::debug;

use pagelens_core::{PageLensError, UserPatch, UserStore};

/// Record one admitted-and-extracted request for `uid`.
pub async fn record_usage(
    store: &dyn UserStore,
    uid: &str,
    today: &str,
) -> Result<(), PageLensError> {
    let Some(record) = store.get_user(uid).await? else {
        debug!(uid, "no user record to update after extraction");
        return Ok(());
    };

    let patch = if record.last_usage_date == today {
        UserPatch {
            daily_usage: Some(record.daily_usage + 1),
            total_usage: Some(record.total_usage + 1),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    } else {
        UserPatch {
            daily_usage: Some(1),
            last_usage_date: Some(today.to_string()),
            total_usage: Some(record.total_usage + 1),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    };

    store.update_fields(uid, &patch).await
}
