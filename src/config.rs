use std::time::Duration;

use crate::upstream::DEFAULT_API_DOMAIN;

pub struct Config {
    pub database_url: String,
    /// Mall the refresh runs for; also the fallback when the payload omits `mall_id`.
    pub mall_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Provider domain; the token endpoint is `https://{mall_id}.{api_domain}`.
    /// Set via MALL_API_DOMAIN. Default: cafe24api.com.
    pub api_domain: String,
    /// Ceiling on one token endpoint call. Set via MALL_TOKEN_TIMEOUT_SECS. Default: 10.
    pub request_timeout_secs: u64,
    /// Set via MALL_SECRET_CACHE_TTL_SECS. Default: 300.
    pub secret_cache_ttl_secs: u64,
    /// Period of the `schedule` command. Set via MALL_REFRESH_INTERVAL_SECS. Default: 3600.
    pub refresh_interval_secs: u64,
    pub port: u16,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn secret_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.secret_cache_ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// Configured mall id, or an empty string when unset.
    pub fn mall_id(&self) -> &str {
        self.mall_id.as_deref().unwrap_or("")
    }
}

/// Connection parameters in the libpq environment convention.
#[derive(Debug, Default)]
pub struct PgParts {
    pub host: Option<String>,
    pub port: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl PgParts {
    fn from_env() -> Self {
        Self {
            host: env_opt("PGHOST"),
            port: env_opt("PGPORT"),
            user: env_opt("PGUSER"),
            password: env_opt("PGPASSWORD"),
            database: env_opt("PGDATABASE"),
        }
    }

    /// DSN with TLS required. All parts except the port (5432) are mandatory.
    pub fn to_url(&self) -> anyhow::Result<String> {
        let (Some(host), Some(user), Some(password), Some(database)) = (
            self.host.as_deref(),
            self.user.as_deref(),
            self.password.as_deref(),
            self.database.as_deref(),
        ) else {
            anyhow::bail!(
                "database is not configured: set DATABASE_URL or PGHOST, PGUSER, PGPASSWORD and PGDATABASE"
            );
        };
        let port = self.port.as_deref().unwrap_or("5432");

        let mut url = url::Url::parse(&format!("postgresql://{}:{}/{}", host, port, database))?;
        url.set_username(user)
            .map_err(|_| anyhow::anyhow!("PGUSER cannot be used in a connection URL"))?;
        url.set_password(Some(password))
            .map_err(|_| anyhow::anyhow!("PGPASSWORD cannot be used in a connection URL"))?;
        url.query_pairs_mut().append_pair("sslmode", "require");
        Ok(url.to_string())
    }
}

pub fn load() -> anyhow::Result<Config> {
    // .env.local wins over .env for local runs; both are optional.
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let database_url = match env_opt("DATABASE_URL") {
        Some(url) => url,
        None => PgParts::from_env().to_url()?,
    };

    Ok(Config {
        database_url,
        mall_id: env_opt("MALL_ID"),
        client_id: env_opt("MALL_CLIENT_ID"),
        client_secret: env_opt("MALL_CLIENT_SECRET"),
        api_domain: env_opt("MALL_API_DOMAIN").unwrap_or_else(|| DEFAULT_API_DOMAIN.into()),
        request_timeout_secs: env_parse("MALL_TOKEN_TIMEOUT_SECS").unwrap_or(10),
        secret_cache_ttl_secs: env_parse("MALL_SECRET_CACHE_TTL_SECS").unwrap_or(300),
        refresh_interval_secs: env_parse("MALL_REFRESH_INTERVAL_SECS").unwrap_or(3600),
        port: env_parse("MALL_PORT").unwrap_or(8080),
    })
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_opt(key).and_then(|v| v.parse().ok())
}
