//! Usage Gate: approval plus rolling daily quota.
//!
//! A stored `last_usage_date` older than today means the counter is stale and
//! counts as zero, so one request is always admitted on a new day. The gate
//! only reads; the recorder advances the counter after a successful
//! extraction. Those two round trips are deliberately unsynchronized — see
//! DESIGN.md for the accepted race.

use chrono::Utc;

use pagelens_core::{PageLensError, UserRecord};

/// Requests admitted per user per calendar day.
pub const DAILY_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Deny(DenyReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// Approval flag is off; an administrator has not enabled this account.
    PendingApproval,
    DailyLimitExceeded { used: u32, limit: u32 },
}

impl From<DenyReason> for PageLensError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::PendingApproval => PageLensError::PendingApproval,
            DenyReason::DailyLimitExceeded { used, limit } => {
                PageLensError::DailyLimitExceeded { used, limit }
            }
        }
    }
}

/// Current UTC calendar date, `YYYY-MM-DD`.
pub fn today_utc() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Decide whether a request from this user may proceed to extraction.
pub fn admit(record: &UserRecord, today: &str) -> Admission {
    if !record.is_premium {
        return Admission::Deny(DenyReason::PendingApproval);
    }
    if record.last_usage_date == today && record.daily_usage >= DAILY_LIMIT {
        return Admission::Deny(DenyReason::DailyLimitExceeded {
            used: record.daily_usage,
            limit: DAILY_LIMIT,
        });
    }
    Admission::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelens_core::VerifiedIdentity;

    fn record(approved: bool, daily_usage: u32, last_usage_date: &str) -> UserRecord {
        let mut record = VerifiedIdentity {
            uid: "u-1".into(),
            email: "u-1@example.com".into(),
            display_name: "Reader".into(),
            photo_url: None,
            email_verified: true,
            phone_number: None,
        }
        .into_new_record(Utc::now(), last_usage_date.into());
        record.is_premium = approved;
        record.daily_usage = daily_usage;
        record
    }

    #[test]
    fn unapproved_user_is_denied_regardless_of_counters() {
        let today = today_utc();
        assert_eq!(
            admit(&record(false, 0, &today), &today),
            Admission::Deny(DenyReason::PendingApproval)
        );
        assert_eq!(
            admit(&record(false, 0, "2020-01-01"), &today),
            Admission::Deny(DenyReason::PendingApproval)
        );
    }

    #[test]
    fn at_limit_today_is_denied() {
        let today = today_utc();
        assert_eq!(
            admit(&record(true, DAILY_LIMIT, &today), &today),
            Admission::Deny(DenyReason::DailyLimitExceeded { used: 50, limit: 50 })
        );
    }

    #[test]
    fn below_limit_today_is_allowed() {
        let today = today_utc();
        assert_eq!(admit(&record(true, DAILY_LIMIT - 1, &today), &today), Admission::Allow);
    }

    #[test]
    fn stale_date_admits_regardless_of_counter() {
        let today = today_utc();
        assert_eq!(admit(&record(true, 999, "2020-01-01"), &today), Admission::Allow);
    }
}
