use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use super::AppState;
use crate::errors::Error;
use crate::jobs::refresh::run_once;

/// POST /refresh — run one refresh cycle for the configured mall.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, Error> {
    let outcome = run_once(&state.rotator, &state.tenant_id).await?;
    Ok(Json(json!({
        "ok": true,
        "message": "Access token refreshed",
        "data": outcome,
    })))
}

/// GET /credential — metadata of the stored row, never token material.
pub async fn get_credential(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, Error> {
    match state.rotator.store().get_credential(&state.tenant_id).await? {
        Some(stored) => Ok((
            StatusCode::OK,
            Json(json!({ "ok": true, "data": stored })),
        )),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "ok": false,
                "message": format!("no credential stored for mall_id '{}'", state.tenant_id),
            })),
        )),
    }
}
