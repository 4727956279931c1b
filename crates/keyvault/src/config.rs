//! Key Vault client configuration

use std::time::Duration;

use keyturn_credential::rotation::ConfigError;
use serde::{Deserialize, Serialize};

/// Placeholder replaced by the vault name in [`KeyVaultConfig::vault_url_template`]
pub const VAULT_PLACEHOLDER: &str = "{vault}";

/// Key Vault client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyVaultConfig {
    /// Base URL of a vault, with `{vault}` standing for its name
    pub vault_url_template: String,

    /// Fixed base URL used for every vault (emulators, tests, private endpoints)
    pub endpoint_override: Option<String>,

    /// `api-version` query parameter
    pub api_version: String,

    /// Per-request timeout (must be between 1 and 120 seconds)
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for KeyVaultConfig {
    fn default() -> Self {
        Self {
            vault_url_template: format!("https://{VAULT_PLACEHOLDER}.vault.azure.net"),
            endpoint_override: None,
            api_version: "7.4".into(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl KeyVaultConfig {
    /// Configuration that sends every request to `endpoint`
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint_override: Some(endpoint.into()),
            ..Self::default()
        }
    }

    /// Base URL for `vault`
    pub fn vault_url(&self, vault: &str) -> String {
        match &self.endpoint_override {
            Some(endpoint) => endpoint.clone(),
            None => self.vault_url_template.replace(VAULT_PLACEHOLDER, vault),
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.endpoint_override {
            Some(endpoint) => {
                url::Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
                    field: "endpoint_override".into(),
                    reason: e.to_string(),
                })?;
            }
            None => {
                if !self.vault_url_template.contains(VAULT_PLACEHOLDER) {
                    return Err(ConfigError::InvalidValue {
                        field: "vault_url_template".into(),
                        reason: format!("must contain {VAULT_PLACEHOLDER}"),
                    });
                }
                if !self.vault_url_template.starts_with("https://") {
                    return Err(ConfigError::InvalidValue {
                        field: "vault_url_template".into(),
                        reason: "must use https".into(),
                    });
                }
            }
        }

        if self.api_version.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "api_version".into(),
            });
        }

        if self.timeout < Duration::from_secs(1) || self.timeout > Duration::from_secs(120) {
            return Err(ConfigError::InvalidValue {
                field: "timeout".into(),
                reason: "must be between 1 and 120 seconds".into(),
            });
        }

        Ok(())
    }
}
