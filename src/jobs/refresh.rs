//! Background job: periodic token refresh.
//!
//! Runs one cycle immediately, then every `interval`. A failed cycle is
//! logged and the job waits for the next tick; the previous credential row
//! stays in place until a cycle succeeds.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::errors::Result;
use crate::rotation::{RefreshOutcome, TokenRotator};

/// Spawn the background refresh task. Call this once at startup.
pub fn spawn(rotator: Arc<TokenRotator>, tenant_id: String, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let _ = run_once(&rotator, &tenant_id).await;
        }
    })
}

/// Run a single cycle and log its outcome.
pub async fn run_once(rotator: &TokenRotator, tenant_id: &str) -> Result<RefreshOutcome> {
    let result = rotator.refresh(tenant_id).await;
    if let Err(e) = &result {
        if e.is_retryable() {
            tracing::warn!(
                tenant_id,
                kind = e.kind(),
                error = %e,
                "token refresh failed, will retry next tick"
            );
        } else {
            tracing::error!(
                tenant_id,
                kind = e.kind(),
                error = %e,
                "token refresh failed and needs attention"
            );
        }
    }
    result
}
