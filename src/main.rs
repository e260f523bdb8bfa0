use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mall_token_refresh::api::{self, AppState};
use mall_token_refresh::cache::SecretCache;
use mall_token_refresh::clock::SystemClock;
use mall_token_refresh::config::{self, Config};
use mall_token_refresh::jobs;
use mall_token_refresh::store::postgres::PgStore;
use mall_token_refresh::store::CredentialStore;
use mall_token_refresh::upstream::UpstreamTokenClient;
use mall_token_refresh::vault::env::EnvSecretSource;
use mall_token_refresh::TokenRotator;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = cli::Cli::parse();
    let mut cfg = config::load()?;
    if let Some(mall_id) = args.mall_id {
        cfg.mall_id = Some(mall_id);
    }

    let result = match args.command.unwrap_or(cli::Commands::Refresh) {
        cli::Commands::Refresh => refresh_once(&cfg).await,
        cli::Commands::Schedule { interval } => {
            let interval = interval
                .map(std::time::Duration::from_secs)
                .unwrap_or_else(|| cfg.refresh_interval());
            run_schedule(&cfg, interval).await
        }
        cli::Commands::Serve { port } => run_server(&cfg, port.unwrap_or(cfg.port)).await,
        cli::Commands::Migrate => {
            let db = PgStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            tracing::info!("migrations applied");
            Ok(())
        }
        cli::Commands::Show => show_credential(&cfg).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "mall_token_refresh=info,tower_http=info".into()),
    );
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn build_rotator(cfg: &Config) -> anyhow::Result<Arc<TokenRotator>> {
    tracing::debug!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url)
        .await
        .context("failed to connect to database")?;

    let client = UpstreamTokenClient::new(cfg.api_domain.clone(), cfg.request_timeout())?;
    let secrets = SecretCache::new(
        Arc::new(EnvSecretSource::from_config(cfg)),
        cfg.secret_cache_ttl(),
    );

    Ok(Arc::new(TokenRotator::new(
        Arc::new(db),
        client,
        secrets,
        Arc::new(SystemClock),
    )))
}

/// One cycle, printed as the JSON envelope a scheduler-invoked function would return.
async fn refresh_once(cfg: &Config) -> anyhow::Result<()> {
    let rotator = build_rotator(cfg).await?;
    match jobs::refresh::run_once(&rotator, cfg.mall_id()).await {
        Ok(outcome) => {
            let body = json!({
                "ok": true,
                "message": "Access token refreshed",
                "data": outcome,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        Err(e) => {
            let body = json!({
                "ok": false,
                "message": "Token refresh failed",
                "error": { "type": e.kind(), "detail": e.to_string(), "retryable": e.is_retryable() },
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Err(e.into())
        }
    }
}

async fn run_schedule(cfg: &Config, interval: std::time::Duration) -> anyhow::Result<()> {
    let rotator = build_rotator(cfg).await?;
    tracing::info!(
        tenant_id = cfg.mall_id(),
        interval_secs = interval.as_secs(),
        "token refresh scheduler started"
    );
    let handle = jobs::refresh::spawn(rotator, cfg.mall_id().to_string(), interval);

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down scheduler");
    handle.abort();
    Ok(())
}

async fn run_server(cfg: &Config, port: u16) -> anyhow::Result<()> {
    let rotator = build_rotator(cfg).await?;
    let state = Arc::new(AppState {
        rotator,
        tenant_id: cfg.mall_id().to_string(),
    });
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("token refresh API listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

async fn show_credential(cfg: &Config) -> anyhow::Result<()> {
    let db = PgStore::connect(&cfg.database_url).await?;
    match db.get_credential(cfg.mall_id()).await? {
        Some(stored) => println!("{}", serde_json::to_string_pretty(&stored)?),
        None => anyhow::bail!("no credential stored for mall_id '{}'", cfg.mall_id()),
    }
    Ok(())
}
