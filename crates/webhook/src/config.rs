//! Webhook server configuration

use std::net::SocketAddr;

use keyturn_credential::rotation::ConfigError;
use serde::{Deserialize, Serialize};

/// Webhook server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Listen address
    pub bind: SocketAddr,

    /// Route receiving notification batches
    pub path: String,

    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 7071)),
            path: "/api/rotation".into(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl WebhookConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.path.starts_with('/') || self.path.len() < 2 {
            return Err(ConfigError::InvalidValue {
                field: "path".into(),
                reason: "must start with `/` and name a route".into(),
            });
        }

        if self.path == "/health" {
            return Err(ConfigError::InvalidValue {
                field: "path".into(),
                reason: "`/health` is reserved".into(),
            });
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_body_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = WebhookConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind.port(), 7071);
    }

    #[test]
    fn relative_path_is_rejected() {
        let config = WebhookConfig {
            path: "api/rotation".into(),
            ..WebhookConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "path"
        ));
    }

    #[test]
    fn health_route_cannot_be_shadowed() {
        let config = WebhookConfig {
            path: "/health".into(),
            ..WebhookConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_partial_config() {
        let config: WebhookConfig =
            serde_json::from_str(r#"{ "bind": "0.0.0.0:8080" }"#).unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.path, "/api/rotation");
    }
}
