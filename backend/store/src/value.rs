//! Firestore document encoding for user records.
//!
//! Firestore's REST API wraps every field in a typed value object
//! (`{"stringValue": ...}`, `{"integerValue": "7"}`, ...). This module maps
//! between that representation and the domain types. Absent optional fields
//! are omitted entirely, matching how the original client stripped
//! null/undefined values before writing.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use pagelens_core::{PageLensError, Role, UserPatch, UserRecord};

fn str_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn int_value(n: u64) -> Value {
    // Firestore serializes 64-bit integers as strings.
    json!({ "integerValue": n.to_string() })
}

fn bool_value(b: bool) -> Value {
    json!({ "booleanValue": b })
}

fn ts_value(dt: DateTime<Utc>) -> Value {
    json!({ "timestampValue": dt.to_rfc3339_opts(SecondsFormat::Millis, true) })
}

fn read_str(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields.get(name)?.get("stringValue")?.as_str().map(str::to_owned)
}

fn read_int(fields: &Map<String, Value>, name: &str) -> Option<u64> {
    let value = fields.get(name)?;
    match value.get("integerValue") {
        Some(v) => v.as_str().and_then(|s| s.parse().ok()).or_else(|| v.as_u64()),
        None => value.get("doubleValue")?.as_f64().map(|f| f as u64),
    }
}

fn read_bool(fields: &Map<String, Value>, name: &str) -> Option<bool> {
    fields.get(name)?.get("booleanValue")?.as_bool()
}

fn read_ts(fields: &Map<String, Value>, name: &str) -> Option<DateTime<Utc>> {
    let raw = fields.get(name)?.get("timestampValue")?.as_str()?;
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Encode a full record as a Firestore document body (`{"fields": ...}`).
pub fn encode_user(record: &UserRecord) -> Value {
    let mut fields = Map::new();
    fields.insert("uid".into(), str_value(&record.uid));
    fields.insert("email".into(), str_value(&record.email));
    fields.insert("displayName".into(), str_value(&record.display_name));
    if let Some(url) = &record.photo_url {
        fields.insert("photoURL".into(), str_value(url));
    }
    fields.insert("emailVerified".into(), bool_value(record.email_verified));
    if let Some(phone) = &record.phone_number {
        fields.insert("phoneNumber".into(), str_value(phone));
    }
    fields.insert("is_premium".into(), bool_value(record.is_premium));
    fields.insert("dailyUsage".into(), int_value(record.daily_usage as u64));
    fields.insert("lastUsageDate".into(), str_value(&record.last_usage_date));
    fields.insert("totalUsage".into(), int_value(record.total_usage));
    fields.insert("createdAt".into(), ts_value(record.created_at));
    fields.insert("updatedAt".into(), ts_value(record.updated_at));
    fields.insert("lastLoginAt".into(), ts_value(record.last_login_at));
    fields.insert("isActive".into(), bool_value(record.is_active));
    fields.insert("role".into(), str_value(record.role.as_str()));
    json!({ "fields": fields })
}

/// Decode a Firestore document body into a record. `uid` is the document key
/// and wins over any stored `uid` field.
pub fn decode_user(uid: &str, document: &Value) -> Result<UserRecord, PageLensError> {
    let fields = document
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| PageLensError::Store(format!("document for {uid} has no fields")))?;

    let role = match read_str(fields, "role").as_deref() {
        Some("admin") => Role::Admin,
        _ => Role::User,
    };
    let epoch = DateTime::<Utc>::UNIX_EPOCH;

    Ok(UserRecord {
        uid: uid.to_string(),
        email: read_str(fields, "email").unwrap_or_default(),
        display_name: read_str(fields, "displayName").unwrap_or_default(),
        photo_url: read_str(fields, "photoURL"),
        email_verified: read_bool(fields, "emailVerified").unwrap_or(false),
        phone_number: read_str(fields, "phoneNumber"),
        is_premium: read_bool(fields, "is_premium").unwrap_or(false),
        daily_usage: read_int(fields, "dailyUsage").unwrap_or(0) as u32,
        last_usage_date: read_str(fields, "lastUsageDate").unwrap_or_default(),
        total_usage: read_int(fields, "totalUsage").unwrap_or(0),
        created_at: read_ts(fields, "createdAt").unwrap_or(epoch),
        updated_at: read_ts(fields, "updatedAt").unwrap_or(epoch),
        last_login_at: read_ts(fields, "lastLoginAt").unwrap_or(epoch),
        is_active: read_bool(fields, "isActive").unwrap_or(true),
        role,
    })
}

/// Encode a partial update: the document body plus the update-mask paths,
/// in a stable order. Only set fields appear in either.
pub fn encode_patch(patch: &UserPatch) -> (Value, Vec<String>) {
    let mut fields = Map::new();
    let mut mask = Vec::new();
    let mut put = |name: &str, value: Value, mask: &mut Vec<String>| {
        fields.insert(name.to_string(), value);
        mask.push(name.to_string());
    };

    if let Some(v) = &patch.display_name {
        put("displayName", str_value(v), &mut mask);
    }
    if let Some(v) = &patch.photo_url {
        put("photoURL", str_value(v), &mut mask);
    }
    if let Some(v) = patch.email_verified {
        put("emailVerified", bool_value(v), &mut mask);
    }
    if let Some(v) = patch.daily_usage {
        put("dailyUsage", int_value(v as u64), &mut mask);
    }
    if let Some(v) = &patch.last_usage_date {
        put("lastUsageDate", str_value(v), &mut mask);
    }
    if let Some(v) = patch.total_usage {
        put("totalUsage", int_value(v), &mut mask);
    }
    if let Some(v) = patch.updated_at {
        put("updatedAt", ts_value(v), &mut mask);
    }
    if let Some(v) = patch.last_login_at {
        put("lastLoginAt", ts_value(v), &mut mask);
    }

    (json!({ "fields": fields }), mask)
}
