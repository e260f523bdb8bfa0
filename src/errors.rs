use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failure of one refresh cycle. Each stage fails fast with the most specific kind.
#[derive(Debug, Error)]
pub enum Error {
    /// Required identity or credential configuration is absent or unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The token endpoint answered 2xx but the payload broke the contract.
    #[error("invalid token payload: {0}")]
    Validation(String),

    #[error("token endpoint failed: {0}")]
    Upstream(#[from] UpstreamError),

    /// No active credential row exists; the mall must be re-authorized.
    #[error("no active refresh token for mall_id '{tenant_id}'")]
    NotFound { tenant_id: String },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection failure, TLS failure or the request timeout elapsed.
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("{}", describe_status(.status, .error, .description))]
    Status {
        status: u16,
        error: Option<String>,
        description: Option<String>,
        body: String,
    },

    #[error("malformed response body: {0}")]
    Decode(#[source] serde_json::Error),
}

fn describe_status(status: &u16, error: &Option<String>, description: &Option<String>) -> String {
    match (error, description) {
        (Some(e), Some(d)) => format!("HTTP {status}: {e} ({d})"),
        (Some(e), None) => format!("HTTP {status}: {e}"),
        _ => format!("HTTP {status}"),
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Stable label used in logs and in the HTTP envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Upstream(_) => "upstream_error",
            Error::NotFound { .. } => "not_found",
            Error::Storage(_) => "storage_error",
        }
    }

    /// Whether re-running the whole cycle later may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Upstream(UpstreamError::Transport(_)) => true,
            Error::Upstream(UpstreamError::Status { status, .. }) => {
                *status == 429 || *status >= 500
            }
            Error::Upstream(UpstreamError::Decode(_)) => false,
            Error::Storage(_) => true,
            Error::Config(_) | Error::Validation(_) | Error::NotFound { .. } => false,
        }
    }

    /// HTTP status returned by the token endpoint, if it answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::Upstream(UpstreamError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message, detail) = match &self {
            Error::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "token refresh is not configured",
                msg.clone(),
            ),
            Error::Validation(msg) => (
                StatusCode::BAD_GATEWAY,
                "token endpoint returned an unusable payload",
                msg.clone(),
            ),
            Error::Upstream(e) => (
                StatusCode::BAD_GATEWAY,
                "failed to refresh token from upstream",
                e.to_string(),
            ),
            Error::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                "no active credential; reauthorization required",
                self.to_string(),
            ),
            Error::Storage(e) => {
                tracing::error!(error = %e, "storage error during token refresh");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to store refreshed token",
                    "internal storage error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "ok": false,
            "message": message,
            "error": {
                "type": self.kind(),
                "detail": detail,
                "retryable": self.is_retryable(),
            }
        }));

        (status, body).into_response()
    }
}
