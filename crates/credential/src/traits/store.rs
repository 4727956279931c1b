//! Secret store boundary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use thiserror::Error;

use crate::core::{SecretRef, Tags};

/// Errors reported by a secret store
#[derive(Debug, Error)]
pub enum StoreError {
    /// No such secret
    #[error("secret `{secret}` not found")]
    NotFound { secret: String },

    /// The store refused the request (authorization, validation)
    #[error("secret store rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Transport or backend failure
    #[error("secret store backend error: {0}")]
    Backend(String),
}

/// Current version of a secret
#[derive(Debug)]
pub struct StoredSecret {
    /// Secret value
    pub value: SecretString,
    /// Attached tags
    pub tags: Tags,
    /// Expiry attribute, if set
    pub expires_on: Option<DateTime<Utc>>,
    /// Store-assigned version identifier, if the store exposes one
    pub version: Option<String>,
}

/// New version to append to a secret
#[derive(Debug)]
pub struct NewSecretVersion {
    /// New value
    pub value: SecretString,
    /// Tags for the new version
    pub tags: Tags,
    /// Expiry attribute for the new version
    pub expires_on: DateTime<Utc>,
}

/// Versioned, tag-annotated secret store
///
/// `set` never edits an existing version: it appends a new one, which becomes
/// the current version returned by `get`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the current version of a secret
    async fn get(&self, secret: &SecretRef) -> Result<StoredSecret, StoreError>;

    /// Append a new version and return its identifier
    async fn set(&self, secret: &SecretRef, version: NewSecretVersion)
    -> Result<String, StoreError>;
}
