//! HTTP client for the storefront platform's OAuth token endpoint.
//! One POST per call, bounded by a request timeout. No retries here:
//! re-running a failed cycle is the scheduler's decision.

use std::time::{Duration, Instant};

use base64::Engine;
use reqwest::header::AUTHORIZATION;
use url::Url;

use crate::errors::{Error, Result, UpstreamError};
use crate::models::RawTokenPayload;

pub const DEFAULT_API_DOMAIN: &str = "cafe24api.com";
pub const TOKEN_PATH: &str = "/api/v2/oauth/token";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error bodies longer than this are cut before they reach logs or errors.
const MAX_ERROR_BODY: usize = 512;

pub struct UpstreamTokenClient {
    client: reqwest::Client,
    api_domain: String,
    /// Replaces `https://{tenant}.{domain}` entirely (local mocks, proxies).
    base_url: Option<Url>,
}

impl UpstreamTokenClient {
    pub fn new(api_domain: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .user_agent(concat!("mall-token-refresh/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_domain: api_domain.into(),
            base_url: None,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> anyhow::Result<Self> {
        self.base_url = Some(Url::parse(base_url)?);
        Ok(self)
    }

    /// Token endpoint for a mall, e.g. `https://shop1.cafe24api.com/api/v2/oauth/token`.
    pub fn token_url(&self, tenant_id: &str) -> Result<Url> {
        validate_tenant_id(tenant_id)?;
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => Url::parse(&format!("https://{}.{}", tenant_id, self.api_domain))
                .map_err(|e| Error::Config(format!("invalid token endpoint host: {}", e)))?,
        };
        base.join(TOKEN_PATH)
            .map_err(|e| Error::Config(format!("invalid token endpoint url: {}", e)))
    }

    /// Exchange `refresh_token` for a new token pair.
    pub async fn refresh(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<RawTokenPayload> {
        for (name, value) in [
            ("mall_id", tenant_id),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} is not set", name)));
            }
        }
        let url = self.token_url(tenant_id)?;

        let started = Instant::now();
        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, basic_auth_header(client_id, client_secret))
            // sets Content-Type: application/x-www-form-urlencoded
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(tenant_id, error = %e, "token endpoint request failed");
                UpstreamError::Transport(e)
            })?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(UpstreamError::Transport)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            let err = status_error(status.as_u16(), &body);
            tracing::warn!(
                tenant_id,
                status = status.as_u16(),
                elapsed_ms,
                error = %err,
                "token endpoint rejected refresh"
            );
            return Err(err.into());
        }

        let payload: RawTokenPayload =
            serde_json::from_slice(&body).map_err(UpstreamError::Decode)?;
        tracing::debug!(tenant_id, elapsed_ms, "token endpoint returned new token pair");
        Ok(payload)
    }
}

/// `Basic base64(client_id:client_secret)`.
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", client_id, client_secret).as_bytes());
    format!("Basic {}", encoded)
}

/// The mall id becomes part of a hostname, so it must be a single DNS label.
pub fn validate_tenant_id(tenant_id: &str) -> Result<()> {
    let valid = !tenant_id.is_empty()
        && tenant_id.len() <= 63
        && !tenant_id.starts_with('-')
        && !tenant_id.ends_with('-')
        && tenant_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "mall_id '{}' is not a valid host label",
            tenant_id
        )))
    }
}

fn status_error(status: u16, body: &[u8]) -> UpstreamError {
    let text = String::from_utf8_lossy(body);
    let (error, description) = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(json) => (
            json.get("error").and_then(|v| v.as_str()).map(String::from),
            json.get("error_description")
                .and_then(|v| v.as_str())
                .map(String::from),
        ),
        Err(_) => (None, None),
    };

    UpstreamError::Status {
        status,
        error,
        description,
        body: truncate(&text, MAX_ERROR_BODY),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
