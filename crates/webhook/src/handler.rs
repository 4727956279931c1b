//! Router and request handlers

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use keyturn_credential::BatchProcessor;
use keyturn_credential::rotation::parse_payload;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;

use crate::config::WebhookConfig;
use crate::error::ApiError;

/// Header carrying the function key
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

const SUBSCRIPTION_VALIDATION_EVENT: &str = "Microsoft.EventGrid.SubscriptionValidationEvent";

/// Shared handler state
#[derive(Clone)]
pub struct WebhookState {
    processor: Arc<BatchProcessor>,
    function_key: Option<Arc<SecretString>>,
}

impl WebhookState {
    pub fn new(processor: Arc<BatchProcessor>) -> Self {
        Self {
            processor,
            function_key: None,
        }
    }

    /// Require callers to present `key` in [`FUNCTION_KEY_HEADER`] or the
    /// `code` query parameter
    pub fn with_function_key(mut self, key: SecretString) -> Self {
        self.function_key = Some(Arc::new(key));
        self
    }

    fn authorize(&self, headers: &HeaderMap, query: &KeyQuery) -> Result<(), ApiError> {
        let Some(expected) = &self.function_key else {
            return Ok(());
        };

        let presented = headers
            .get(FUNCTION_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .or(query.code.as_deref())
            .ok_or(ApiError::Unauthorized)?;

        if bool::from(
            presented
                .as_bytes()
                .ct_eq(expected.expose_secret().as_bytes()),
        ) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct KeyQuery {
    code: Option<String>,
}

/// Build the webhook router
///
/// `POST {config.path}` receives notification batches and `GET /health`
/// answers liveness probes.
pub fn router(state: WebhookState, config: &WebhookConfig) -> Router {
    Router::new()
        .route(&config.path, post(receive_batch))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn receive_batch(
    State(state): State<WebhookState>,
    Query(query): Query<KeyQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    state.authorize(&headers, &query).inspect_err(|_| {
        tracing::warn!("Rejected notification batch without a valid function key");
    })?;

    let events = parse_payload(&body).inspect_err(|e| {
        tracing::warn!(error = %e, "Rejected notification batch");
    })?;

    if let Some(code) = validation_code(&events) {
        tracing::info!("Answering subscription validation handshake");
        return Ok((
            StatusCode::OK,
            Json(json!({ "validationResponse": code })),
        )
            .into_response());
    }

    state.processor.process(&events).await;

    Ok((StatusCode::OK, Json(json!({ "status": "accepted" }))).into_response())
}

/// Validation code of a subscription handshake batch, if this is one
fn validation_code(events: &[Value]) -> Option<&str> {
    events
        .iter()
        .find(|event| {
            event.get("eventType").and_then(Value::as_str) == Some(SUBSCRIPTION_VALIDATION_EVENT)
        })
        .and_then(|event| event.pointer("/data/validationCode"))
        .and_then(Value::as_str)
}
