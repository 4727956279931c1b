//! Dependent-target boundary

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

/// Errors reported by a dependent-target configuration store
#[derive(Debug, Error)]
pub enum TargetError {
    /// Target could not be resolved
    #[error("target `{0}` not found")]
    TargetNotFound(String),

    /// Transport or backend failure
    #[error("target backend error: {0}")]
    Backend(String),
}

/// Configuration store of the applications that embed the credential
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TargetConfigStore: Send + Sync {
    /// Read a configuration entry; `Ok(None)` when the entry does not exist
    async fn read_config_entry(
        &self,
        target: &str,
        entry: &str,
    ) -> Result<Option<SecretString>, TargetError>;

    /// Create or replace a configuration entry
    async fn write_config_entry(
        &self,
        target: &str,
        entry: &str,
        value: &SecretString,
    ) -> Result<(), TargetError>;
}
