//! Redaction of secret config values for startup logging.

/// Replace all but the last four characters of a secret with `***`.
/// Short secrets are fully masked.
pub fn redact_secret(value: &str) -> String {
    if value.len() <= 4 {
        return "***".to_string();
    }
    format!("***{}", &value[value.len() - 4..])
}

/// Redact an optional secret, showing `<unset>` when absent.
pub fn redact_opt(value: Option<&str>) -> String {
    match value {
        Some(v) => redact_secret(v),
        None => "<unset>".to_string(),
    }
}
