//! Maps a raw token endpoint payload onto the stored credential row.
//!
//! Only genuinely optional fields get defaults: `token_type` ("bearer"),
//! `scopes` (empty), `issued_at` (now) and the tenant id (the configured mall).
//! Missing tokens or expiry timestamps are validation errors. No I/O happens here.

pub mod timestamp;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::clock::Clock;
use crate::errors::{Error, Result};
use crate::models::{CredentialRecord, CredentialStatus, RawTokenPayload};

pub use timestamp::{civil_offset, parse_civil, to_civil};

pub const DEFAULT_TOKEN_TYPE: &str = "bearer";

/// Payload keys that may carry the tenant id, in lookup order.
const TENANT_KEYS: &[&str] = &["mall_id", "tenant_id"];

pub fn normalize(
    raw: &RawTokenPayload,
    fallback_tenant_id: &str,
    clock: &dyn Clock,
) -> Result<CredentialRecord> {
    let access_token = required_str(raw, "access_token")?.to_string();
    let refresh_token = required_str(raw, "refresh_token")?.to_string();
    let expires_at = required_timestamp(raw, "expires_at")?;
    let refresh_token_expires_at = required_timestamp(raw, "refresh_token_expires_at")?;

    let tenant_id = match TENANT_KEYS
        .iter()
        .map(|key| optional_str(raw, key))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .next()
    {
        Some(id) => id,
        None if !fallback_tenant_id.trim().is_empty() => fallback_tenant_id.trim().to_string(),
        None => {
            return Err(Error::Config(
                "payload carries no mall_id and no fallback mall_id is configured".into(),
            ))
        }
    };

    let now = clock.now();
    let issued_at = match optional_str(raw, "issued_at")? {
        Some(s) => parse_civil(&s).map_err(|e| invalid_timestamp("issued_at", e))?,
        None => to_civil(now),
    };

    Ok(CredentialRecord {
        access_token,
        expires_at,
        refresh_token,
        refresh_token_expires_at,
        client_id: optional_str(raw, "client_id")?,
        tenant_id,
        user_id: optional_str(raw, "user_id")?,
        scopes: scopes(raw)?,
        token_type: optional_str(raw, "token_type")?
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
        issued_at,
        updated_at: now,
        status: CredentialStatus::Active,
    })
}

fn required_str<'a>(raw: &'a RawTokenPayload, key: &str) -> Result<&'a str> {
    match raw.get(key) {
        None | Some(Value::Null) => Err(Error::Validation(format!(
            "missing required field '{}'",
            key
        ))),
        Some(Value::String(s)) if s.trim().is_empty() => Err(Error::Validation(format!(
            "required field '{}' is empty",
            key
        ))),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(Error::Validation(format!(
            "field '{}' must be a string, got {}",
            key,
            json_type(other)
        ))),
    }
}

/// Absent, null and empty values all read as `None`. Numbers are accepted
/// for identifier fields since some malls return numeric user ids.
fn optional_str(raw: &RawTokenPayload, key: &str) -> Result<Option<String>> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(Error::Validation(format!(
            "field '{}' must be a string, got {}",
            key,
            json_type(other)
        ))),
    }
}

fn required_timestamp(raw: &RawTokenPayload, key: &str) -> Result<DateTime<FixedOffset>> {
    let s = required_str(raw, key)?;
    parse_civil(s).map_err(|e| invalid_timestamp(key, e))
}

fn invalid_timestamp(key: &str, reason: String) -> Error {
    Error::Validation(format!("field '{}': {}", key, reason))
}

/// `scopes` is normally an array; a whitespace/comma separated string is tolerated.
fn scopes(raw: &RawTokenPayload) -> Result<Vec<String>> {
    match raw.get("scopes") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(Error::Validation(format!(
                    "scopes entries must be strings, got {}",
                    json_type(other)
                ))),
            })
            .collect(),
        Some(Value::String(s)) => Ok(s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect()),
        Some(other) => Err(Error::Validation(format!(
            "scopes must be an array, got {}",
            json_type(other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
