//! Inbound rotation notifications
//!
//! Fields are pulled out by pattern match rather than a typed schema: the
//! event envelope is owned by the delivery service and only three values are
//! needed. An unmatched field becomes an empty string.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::error::{RotationError, RotationResult};

static VAULT_IN_TOPIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r".vaults.(.*)").unwrap());

static VERSION_IN_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Version":"([a-z0-9]*)"#).unwrap());

/// The batch body could not be read as a list of events
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload is empty")]
    Empty,

    #[error("payload is not a JSON array of events: {0}")]
    Unparsable(String),
}

/// Parse a batch body into its events
pub fn parse_payload(body: &[u8]) -> Result<Vec<Value>, PayloadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(PayloadError::Empty);
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Array(events)) => Ok(events),
        Ok(other) => Err(PayloadError::Unparsable(format!(
            "expected an array, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(PayloadError::Unparsable(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One secret due for rotation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationNotification {
    /// Secret name, from the event subject
    pub secret_name: String,
    /// Vault name, from the event topic
    pub vault_name: String,
    /// Version that triggered the event; informational only
    pub secret_version: String,
}

impl RotationNotification {
    /// Build a notification directly
    pub fn new(vault_name: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            secret_name: secret_name.into(),
            vault_name: vault_name.into(),
            secret_version: String::new(),
        }
    }

    /// Extract the notification fields from one event
    ///
    /// ```
    /// use keyturn_credential::rotation::RotationNotification;
    /// use serde_json::json;
    ///
    /// let event = json!({
    ///     "subject": "db-login-secret",
    ///     "topic": "/subscriptions/x/resourceGroups/y/providers/Microsoft.KeyVault/vaults/myvault",
    ///     "data": { "Id": "https://myvault.vault.azure.net/secrets/db-login-secret/abc123", "Version": "abc123" }
    /// });
    ///
    /// let notification = RotationNotification::from_event(&event);
    /// assert_eq!(notification.secret_name, "db-login-secret");
    /// assert_eq!(notification.vault_name, "myvault");
    /// assert_eq!(notification.secret_version, "abc123");
    /// ```
    pub fn from_event(event: &Value) -> Self {
        let secret_name = event
            .get("subject")
            .map(text_of)
            .unwrap_or_default();

        let topic = event.get("topic").map(text_of).unwrap_or_default();
        let vault_name = VAULT_IN_TOPIC
            .captures(&topic)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let data = event.get("data").map(text_of).unwrap_or_default();
        let secret_version = VERSION_IN_DATA
            .captures(&data)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        Self {
            secret_name,
            vault_name,
            secret_version,
        }
    }

    /// Fail with `MalformedNotification` when the secret or vault name is missing
    pub fn ensure_complete(&self) -> RotationResult<()> {
        let missing = match (
            self.secret_name.trim().is_empty(),
            self.vault_name.trim().is_empty(),
        ) {
            (false, false) => return Ok(()),
            (true, false) => "secret name (subject)",
            (false, true) => "vault name (topic)",
            (true, true) => "secret name (subject) and vault name (topic)",
        };

        Err(RotationError::MalformedNotification {
            reason: format!("missing {missing}"),
        })
    }
}

/// Strings as-is, everything else as compact JSON text
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
