use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token endpoint response exactly as received, keyed by upstream field names.
pub type RawTokenPayload = serde_json::Map<String, serde_json::Value>;

/// Lifecycle state of a stored credential row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Active,
    Revoked,
    Expired,
}

impl CredentialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialStatus::Active => "active",
            CredentialStatus::Revoked => "revoked",
            CredentialStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CredentialStatus::Active),
            "revoked" => Ok(CredentialStatus::Revoked),
            "expired" => Ok(CredentialStatus::Expired),
            other => Err(format!("unknown credential status '{}'", other)),
        }
    }
}

/// Full row written by a refresh cycle. Business timestamps carry the mall's
/// civil offset (+09:00); `updated_at` is bookkeeping and stays in UTC.
#[derive(Clone, PartialEq)]
pub struct CredentialRecord {
    pub access_token: String,
    pub expires_at: DateTime<FixedOffset>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<FixedOffset>,
    pub client_id: Option<String>,
    pub tenant_id: String,
    pub user_id: Option<String>,
    pub scopes: Vec<String>,
    pub token_type: String,
    pub issued_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<Utc>,
    pub status: CredentialStatus,
}

// Token material stays out of logs.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &"[REDACTED]")
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .field("client_id", &self.client_id)
            .field("tenant_id", &self.tenant_id)
            .field("user_id", &self.user_id)
            .field("scopes", &self.scopes)
            .field("token_type", &self.token_type)
            .field("issued_at", &self.issued_at)
            .field("updated_at", &self.updated_at)
            .field("status", &self.status)
            .finish()
    }
}

/// Identity fields returned by the upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedCredential {
    pub id: Uuid,
    pub tenant_id: String,
    pub issued_at: DateTime<FixedOffset>,
    pub expires_at: DateTime<FixedOffset>,
}

/// Current row metadata, without token material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredCredential {
    pub id: Uuid,
    pub tenant_id: String,
    pub client_id: Option<String>,
    pub user_id: Option<String>,
    pub scopes: Vec<String>,
    pub token_type: String,
    pub issued_at: DateTime<FixedOffset>,
    pub expires_at: DateTime<FixedOffset>,
    pub refresh_token_expires_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<Utc>,
    pub status: CredentialStatus,
}
