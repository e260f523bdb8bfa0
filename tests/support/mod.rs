#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use mall_token_refresh::cache::SecretCache;
use mall_token_refresh::clock::FixedClock;
use mall_token_refresh::errors::{Error, Result};
use mall_token_refresh::models::{
    CredentialRecord, CredentialStatus, PersistedCredential, StoredCredential,
};
use mall_token_refresh::normalize::to_civil;
use mall_token_refresh::store::CredentialStore;
use mall_token_refresh::upstream::UpstreamTokenClient;
use mall_token_refresh::vault::env::EnvSecretSource;
use mall_token_refresh::vault::{ClientCredentials, SecretSource};
use mall_token_refresh::TokenRotator;

pub const CLIENT_ID: &str = "client-abc";
pub const CLIENT_SECRET: &str = "secret-xyz";

/// In-memory stand-in for the Postgres store: one row per mall id.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    rows: Mutex<HashMap<String, (uuid::Uuid, CredentialRecord)>>,
    pub fetch_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
    pub fail_upserts: AtomicBool,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, tenant_id: &str, refresh_token: &str, status: CredentialStatus) {
        let t = to_civil(Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap());
        let record = CredentialRecord {
            access_token: "a1".to_string(),
            expires_at: t,
            refresh_token: refresh_token.to_string(),
            refresh_token_expires_at: t,
            client_id: Some("old-client".to_string()),
            tenant_id: tenant_id.to_string(),
            user_id: Some("old-user".to_string()),
            scopes: vec!["mall.read_order".to_string()],
            token_type: "bearer".to_string(),
            issued_at: t,
            updated_at: t.with_timezone(&Utc),
            status,
        };
        self.rows
            .lock()
            .expect("store lock poisoned")
            .insert(tenant_id.to_string(), (uuid::Uuid::new_v4(), record));
    }

    pub fn record(&self, tenant_id: &str) -> Option<CredentialRecord> {
        self.rows
            .lock()
            .expect("store lock poisoned")
            .get(tenant_id)
            .map(|(_, r)| r.clone())
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().expect("store lock poisoned").len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn fetch_active_refresh_token(&self, tenant_id: &str) -> Result<String> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .expect("store lock poisoned")
            .get(tenant_id)
            .filter(|(_, r)| r.status == CredentialStatus::Active)
            .map(|(_, r)| r.refresh_token.clone())
            .ok_or_else(|| Error::NotFound {
                tenant_id: tenant_id.to_string(),
            })
    }

    async fn upsert_credential(&self, record: &CredentialRecord) -> Result<PersistedCredential> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(Error::Storage(sqlx::Error::PoolTimedOut));
        }
        let mut rows = self.rows.lock().expect("store lock poisoned");
        let id = rows
            .get(&record.tenant_id)
            .map(|(id, _)| *id)
            .unwrap_or_else(uuid::Uuid::new_v4);
        rows.insert(record.tenant_id.clone(), (id, record.clone()));
        Ok(PersistedCredential {
            id,
            tenant_id: record.tenant_id.clone(),
            issued_at: record.issued_at,
            expires_at: record.expires_at,
        })
    }

    async fn get_credential(&self, tenant_id: &str) -> Result<Option<StoredCredential>> {
        Ok(self
            .rows
            .lock()
            .expect("store lock poisoned")
            .get(tenant_id)
            .map(|(id, r)| StoredCredential {
                id: *id,
                tenant_id: r.tenant_id.clone(),
                client_id: r.client_id.clone(),
                user_id: r.user_id.clone(),
                scopes: r.scopes.clone(),
                token_type: r.token_type.clone(),
                issued_at: r.issued_at,
                expires_at: r.expires_at,
                refresh_token_expires_at: r.refresh_token_expires_at,
                updated_at: r.updated_at,
                status: r.status,
            }))
    }
}

/// Secret source that counts lookups and always returns the same pair.
#[derive(Default)]
pub struct CountingSecretSource {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SecretSource for CountingSecretSource {
    async fn fetch(&self, _tenant_id: &str) -> Result<ClientCredentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ClientCredentials {
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
        })
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 28, 15, 30, 0).unwrap()
}

pub fn rotator_with_source(
    store: Arc<InMemoryCredentialStore>,
    base_url: &str,
    source: Arc<dyn SecretSource>,
) -> TokenRotator {
    let client = UpstreamTokenClient::new("cafe24api.com", Duration::from_secs(2))
        .expect("build client")
        .with_base_url(base_url)
        .expect("base url");
    let secrets = SecretCache::new(source, Duration::from_secs(300));
    TokenRotator::new(store, client, secrets, Arc::new(FixedClock(fixed_now())))
}

pub fn rotator_with(
    store: Arc<InMemoryCredentialStore>,
    base_url: &str,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> TokenRotator {
    let source = EnvSecretSource::new(
        client_id.map(String::from),
        client_secret.map(String::from),
    );
    rotator_with_source(store, base_url, Arc::new(source))
}

pub fn rotator(store: Arc<InMemoryCredentialStore>, base_url: &str) -> TokenRotator {
    rotator_with(store, base_url, Some(CLIENT_ID), Some(CLIENT_SECRET))
}
