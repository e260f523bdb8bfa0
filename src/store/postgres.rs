use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::CredentialStore;
use crate::errors::{Error, Result};
use crate::models::{CredentialRecord, CredentialStatus, PersistedCredential, StoredCredential};
use crate::normalize::to_civil;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// A refresh cycle is sequential, so a couple of connections is plenty.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Mark the mall's row with a non-active status. Used by operators and tests;
    /// the refresh cycle itself never calls this.
    pub async fn set_status(&self, tenant_id: &str, status: CredentialStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE mall.oauth_tokens SET status = $2, updated_at = NOW() WHERE mall_id = $1",
        )
        .bind(tenant_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_for_tenant(&self, tenant_id: &str) -> Result<i64> {
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM mall.oauth_tokens WHERE mall_id = $1",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }
}

const UPSERT_SQL: &str = r#"
    INSERT INTO mall.oauth_tokens (
        access_token,
        expires_at,
        refresh_token,
        refresh_token_expires_at,
        client_id,
        mall_id,
        user_id,
        scopes,
        token_type,
        issued_at,
        updated_at,
        status
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ON CONFLICT (mall_id)
    DO UPDATE SET
        access_token             = EXCLUDED.access_token,
        expires_at               = EXCLUDED.expires_at,
        refresh_token            = EXCLUDED.refresh_token,
        refresh_token_expires_at = EXCLUDED.refresh_token_expires_at,
        client_id                = EXCLUDED.client_id,
        user_id                  = EXCLUDED.user_id,
        scopes                   = EXCLUDED.scopes,
        token_type               = EXCLUDED.token_type,
        issued_at                = EXCLUDED.issued_at,
        updated_at               = EXCLUDED.updated_at,
        status                   = EXCLUDED.status
    RETURNING id, mall_id, issued_at, expires_at
"#;

#[async_trait]
impl CredentialStore for PgStore {
    async fn fetch_active_refresh_token(&self, tenant_id: &str) -> Result<String> {
        let token = sqlx::query_scalar::<_, String>(
            r#"SELECT refresh_token
               FROM mall.oauth_tokens
               WHERE mall_id = $1 AND status = 'active'
               ORDER BY updated_at DESC, id DESC
               LIMIT 1"#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        token.ok_or_else(|| Error::NotFound {
            tenant_id: tenant_id.to_string(),
        })
    }

    async fn upsert_credential(&self, record: &CredentialRecord) -> Result<PersistedCredential> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UpsertRow>(UPSERT_SQL)
            .bind(&record.access_token)
            .bind(record.expires_at)
            .bind(&record.refresh_token)
            .bind(record.refresh_token_expires_at)
            .bind(&record.client_id)
            .bind(&record.tenant_id)
            .bind(&record.user_id)
            .bind(&record.scopes)
            .bind(&record.token_type)
            .bind(record.issued_at)
            .bind(record.updated_at)
            .bind(record.status.as_str())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(PersistedCredential {
            id: row.id,
            tenant_id: row.mall_id,
            issued_at: to_civil(row.issued_at),
            expires_at: to_civil(row.expires_at),
        })
    }

    async fn get_credential(&self, tenant_id: &str) -> Result<Option<StoredCredential>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"SELECT id, mall_id, client_id, user_id, scopes, token_type, issued_at,
                      expires_at, refresh_token_expires_at, updated_at, status
               FROM mall.oauth_tokens
               WHERE mall_id = $1"#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialRow::into_stored).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct UpsertRow {
    id: Uuid,
    mall_id: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    mall_id: String,
    client_id: Option<String>,
    user_id: Option<String>,
    scopes: Vec<String>,
    token_type: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    refresh_token_expires_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    status: String,
}

impl CredentialRow {
    fn into_stored(self) -> Result<StoredCredential> {
        let status = self
            .status
            .parse::<CredentialStatus>()
            .map_err(|e| Error::Storage(sqlx::Error::Decode(e.into())))?;
        Ok(StoredCredential {
            id: self.id,
            tenant_id: self.mall_id,
            client_id: self.client_id,
            user_id: self.user_id,
            scopes: self.scopes,
            token_type: self.token_type,
            issued_at: to_civil(self.issued_at),
            expires_at: to_civil(self.expires_at),
            refresh_token_expires_at: to_civil(self.refresh_token_expires_at),
            updated_at: self.updated_at,
            status,
        })
    }
}
