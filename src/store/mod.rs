pub mod postgres;

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{CredentialRecord, PersistedCredential, StoredCredential};

/// Persistence for per-mall OAuth credentials. One row per mall id.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Refresh token of the most recently updated active row for the mall.
    /// `Error::NotFound` when the mall has no active credential.
    async fn fetch_active_refresh_token(&self, tenant_id: &str) -> Result<String>;

    /// Insert the row, or overwrite every mutable column of the mall's existing
    /// row, in a single transaction.
    async fn upsert_credential(&self, record: &CredentialRecord) -> Result<PersistedCredential>;

    /// Current row metadata regardless of status.
    async fn get_credential(&self, tenant_id: &str) -> Result<Option<StoredCredential>>;
}
