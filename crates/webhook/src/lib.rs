//! Keyturn Webhook - HTTP entry point for rotation notifications
//!
//! Accepts batches of secret-expiry events, answers the delivery service's
//! subscription handshake and hands every other batch to a
//! [`BatchProcessor`](keyturn_credential::BatchProcessor).
//!
//! Response contract: an empty or unparsable body is a client error; any
//! well-formed batch is acknowledged with `200 {"status":"accepted"}`, with
//! per-notification outcomes reported only through logs.
#![deny(unsafe_code)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod handler;
mod server;

pub use config::WebhookConfig;
pub use error::{ApiError, WebhookError};
pub use handler::{FUNCTION_KEY_HEADER, WebhookState, router};
pub use server::{serve, serve_with_listener};
