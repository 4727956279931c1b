//! Validation and metadata error types
//!
//! Both kinds are raised before any external mutation happens, so a rotation
//! that fails with one of them leaves the secret store and data service
//! untouched.

use std::fmt;

use thiserror::Error;

/// Which identifier failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    /// Secret-store (vault) name
    Vault,
    /// Secret name inside a vault
    Secret,
    /// Data-service login name
    Login,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Vault => write!(f, "vault name"),
            IdentifierKind::Secret => write!(f, "secret name"),
            IdentifierKind::Login => write!(f, "login name"),
        }
    }
}

/// A malformed identifier (vault name, secret name or login name)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} `{value}`: {reason}")]
pub struct ValidationError {
    /// Identifier kind that was rejected
    pub kind: IdentifierKind,
    /// The rejected value
    pub value: String,
    /// Human-readable rule that was violated
    pub reason: String,
}

impl ValidationError {
    pub(crate) fn new(kind: IdentifierKind, value: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Secret tags that cannot be turned into a usable [`SecretMetadata`](crate::core::SecretMetadata)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// `ValidityPeriodDays` is not a positive integer
    #[error("validity period `{value}` is not a positive number of days")]
    InvalidValidityPeriod { value: String },

    /// Expiry would overflow the representable time range
    #[error("validity period of {days} days overflows the expiry timestamp")]
    ExpiryOverflow { days: u32 },

    /// `ProviderAddress` is not a resource path with a server segment
    #[error("provider address `{address}` is malformed: {reason}")]
    MalformedProviderAddress { address: String, reason: String },

    /// `webapp[...]` and `connstring[...]` counts differ under the reject policy
    #[error("{targets} `webapp[...]` tags do not pair with {entries} `connstring[...]` tags")]
    BindingCountMismatch { targets: usize, entries: usize },
}
