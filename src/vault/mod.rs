pub mod env;

use std::fmt;

use async_trait::async_trait;

use crate::errors::Result;

/// OAuth client identity used to authenticate against the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Abstraction over where client secrets live.
/// Implementations: EnvSecretSource (process environment / .env files).
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Resolve the client credentials for a mall. Missing material is
    /// `Error::Config`.
    async fn fetch(&self, tenant_id: &str) -> Result<ClientCredentials>;
}
