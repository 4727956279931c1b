//! Rotation configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::retry::RetryPolicy;
use crate::core::BindingPolicy;

/// Shortest accepted lease lifetime
pub const MIN_LEASE_TTL: Duration = Duration::from_secs(3);

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Missing required configuration
    #[error("Missing required configuration: {field}")]
    MissingRequired { field: String },

    /// Configuration validation failed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// What a rotation does when another rotation of the same secret holds the lease
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ContentionPolicy {
    /// Give up immediately with `RotationInProgress`
    #[default]
    Skip,

    /// Poll for the lease until `max_wait` elapses
    Wait {
        #[serde(with = "humantime_serde")]
        max_wait: Duration,
        #[serde(with = "humantime_serde")]
        poll_interval: Duration,
    },
}

/// Settings for [`RotationOrchestrator`](super::RotationOrchestrator) and
/// [`BatchProcessor`](super::BatchProcessor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// DNS suffix appended to the server segment of the provider address
    pub service_domain: String,

    /// Upper bound on the preflight probe
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,

    /// Lease lifetime, renewed every third of it while a rotation runs
    #[serde(with = "humantime_serde")]
    pub lease_ttl: Duration,

    /// Behaviour under concurrent rotations of one secret
    pub contention: ContentionPolicy,

    /// Behaviour when binding tag counts differ
    pub binding_policy: BindingPolicy,

    /// Notifications processed at once within a batch
    pub max_concurrency: usize,

    /// Retry applied to the secret-store write
    pub store_write_retry: RetryPolicy,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            service_domain: "database.windows.net".into(),
            probe_timeout: Duration::from_secs(30),
            lease_ttl: Duration::from_secs(300),
            contention: ContentionPolicy::default(),
            binding_policy: BindingPolicy::default(),
            max_concurrency: 4,
            store_write_retry: RetryPolicy::default(),
        }
    }
}

impl RotationConfig {
    /// How often a held lease is renewed
    pub fn lease_renew_interval(&self) -> Duration {
        self.lease_ttl / 3
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let domain = self.service_domain.trim_start_matches('.');
        if domain.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "service_domain".into(),
            });
        }
        if domain.contains(['/', ':', ' ']) {
            return Err(ConfigError::InvalidValue {
                field: "service_domain".into(),
                reason: "must be a bare DNS suffix such as database.windows.net".into(),
            });
        }

        if self.probe_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "probe_timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }

        if self.lease_ttl < MIN_LEASE_TTL {
            return Err(ConfigError::InvalidValue {
                field: "lease_ttl".into(),
                reason: format!("must be at least {MIN_LEASE_TTL:?}"),
            });
        }
        if self.lease_ttl <= self.probe_timeout {
            return Err(ConfigError::InvalidValue {
                field: "lease_ttl".into(),
                reason: "must be longer than probe_timeout".into(),
            });
        }

        if let ContentionPolicy::Wait {
            max_wait,
            poll_interval,
        } = &self.contention
        {
            if poll_interval.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: "contention.poll_interval".into(),
                    reason: "must be greater than zero".into(),
                });
            }
            if poll_interval > max_wait {
                return Err(ConfigError::InvalidValue {
                    field: "contention.poll_interval".into(),
                    reason: "must not exceed max_wait".into(),
                });
            }
        }

        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrency".into(),
                reason: "must be at least 1".into(),
            });
        }

        let retry = &self.store_write_retry;
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store_write_retry.max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        if retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "store_write_retry.backoff_multiplier must be >= 1.0, got {}",
                retry.backoff_multiplier
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RotationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.probe_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.store_write_retry.max_attempts, 3);
        assert_eq!(config.contention, ContentionPolicy::Skip);
    }

    #[test]
    fn deserializes_humantime_and_tagged_contention() {
        let json = r#"{
            "probe_timeout": "10s",
            "lease_ttl": "2m",
            "contention": { "mode": "wait", "max_wait": "1m", "poll_interval": "500ms" },
            "binding_policy": "reject"
        }"#;

        let config: RotationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.lease_ttl, Duration::from_secs(120));
        assert_eq!(
            config.contention,
            ContentionPolicy::Wait {
                max_wait: Duration::from_secs(60),
                poll_interval: Duration::from_millis(500),
            }
        );
        assert_eq!(config.binding_policy, BindingPolicy::Reject);
        assert_eq!(config.service_domain, "database.windows.net");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let config = RotationConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "max_concurrency"
        ));
    }

    #[test]
    fn rejects_lease_shorter_than_probe() {
        let config = RotationConfig {
            lease_ttl: Duration::from_secs(5),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_lease_too_short_to_renew() {
        let config = RotationConfig {
            probe_timeout: Duration::from_secs(1),
            lease_ttl: Duration::from_secs(2),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "lease_ttl"
        ));
    }

    #[test]
    fn lease_is_renewed_three_times_per_ttl() {
        let config = RotationConfig::default();
        assert_eq!(config.lease_renew_interval(), Duration::from_secs(100));
    }

    #[test]
    fn rejects_domain_with_scheme() {
        let config = RotationConfig {
            service_domain: "https://db.example".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
