use async_trait::async_trait;

use super::{ClientCredentials, SecretSource};
use crate::config::Config;
use crate::errors::{Error, Result};

/// Serves the client id/secret captured from the environment at startup.
/// The same pair is used for every mall.
pub struct EnvSecretSource {
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl EnvSecretSource {
    pub fn new(client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.client_id.clone(), cfg.client_secret.clone())
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn fetch(&self, _tenant_id: &str) -> Result<ClientCredentials> {
        let client_id = non_empty(&self.client_id)
            .ok_or_else(|| Error::Config("MALL_CLIENT_ID is not set".into()))?;
        let client_secret = non_empty(&self.client_secret)
            .ok_or_else(|| Error::Config("MALL_CLIENT_SECRET is not set".into()))?;
        Ok(ClientCredentials {
            client_id,
            client_secret,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
