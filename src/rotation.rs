//! One refresh cycle for a mall:
//! stored refresh token → token endpoint → normalized row → transactional upsert.
//!
//! Any failure aborts the cycle before the write, so the stored row stays the
//! last-known-good credential until a complete new row is committed.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::cache::SecretCache;
use crate::clock::Clock;
use crate::errors::{Error, Result};
use crate::normalize::normalize;
use crate::store::CredentialStore;
use crate::upstream::{validate_tenant_id, UpstreamTokenClient};

/// Result of a successful cycle.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub token_row_id: Uuid,
    pub tenant_id: String,
    pub issued_at: DateTime<FixedOffset>,
    pub expires_at: DateTime<FixedOffset>,
    pub refresh_token_expires_at: DateTime<FixedOffset>,
    pub refreshed_at: DateTime<Utc>,
}

pub struct TokenRotator {
    store: Arc<dyn CredentialStore>,
    client: UpstreamTokenClient,
    secrets: SecretCache,
    clock: Arc<dyn Clock>,
}

impl TokenRotator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        client: UpstreamTokenClient,
        secrets: SecretCache,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            client,
            secrets,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Run one cycle for `tenant_id`.
    ///
    /// Configuration is checked first, so a missing mall id or client secret
    /// fails before storage or the network is touched.
    pub async fn refresh(&self, tenant_id: &str) -> Result<RefreshOutcome> {
        let started = Instant::now();
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(Error::Config("MALL_ID is not set".into()));
        }
        validate_tenant_id(tenant_id)?;
        let creds = self.secrets.get(tenant_id).await?;

        let refresh_token = self.store.fetch_active_refresh_token(tenant_id).await?;

        let raw = match self
            .client
            .refresh(
                tenant_id,
                &creds.client_id,
                &creds.client_secret,
                &refresh_token,
            )
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                if e.upstream_status() == Some(401) {
                    // Client secret may have been rotated; reload it next cycle.
                    self.secrets.invalidate(tenant_id);
                }
                return Err(e);
            }
        };

        let record = normalize(&raw, tenant_id, self.clock.as_ref())?;
        if record.tenant_id != tenant_id {
            tracing::warn!(
                tenant_id,
                payload_tenant_id = %record.tenant_id,
                "token endpoint answered for a different mall_id"
            );
        }

        let persisted = self.store.upsert_credential(&record).await?;

        tracing::info!(
            tenant_id = %persisted.tenant_id,
            token_row_id = %persisted.id,
            expires_at = %persisted.expires_at,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "access token refreshed"
        );

        Ok(RefreshOutcome {
            token_row_id: persisted.id,
            tenant_id: persisted.tenant_id,
            issued_at: persisted.issued_at,
            expires_at: persisted.expires_at,
            refresh_token_expires_at: record.refresh_token_expires_at,
            refreshed_at: self.clock.now(),
        })
    }
}
