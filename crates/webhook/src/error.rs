//! Webhook errors

use std::net::SocketAddr;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keyturn_credential::rotation::{ConfigError, PayloadError};
use serde_json::json;
use thiserror::Error;

/// Errors starting or running the server
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Request-level failures returned to the caller
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("missing or invalid function key")]
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Payload(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
