//! Rotation-specific error types
//!
//! [`RotationError`] is fatal to a single rotation. [`PropagationError`] is
//! never fatal: it is recorded per binding and stops at the propagator.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::RotationState;
use crate::core::{MetadataError, ValidationError};
use crate::traits::{LockError, ServiceError, StoreError, TargetError};

/// Why the preflight probe failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightCause {
    /// Host unreachable
    ServiceUnreachable(String),
    /// Current credential rejected
    AuthenticationFailed(String),
    /// Probe did not finish in time
    TimedOut(Duration),
}

impl fmt::Display for PreflightCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreflightCause::ServiceUnreachable(reason) => {
                write!(f, "service unreachable: {reason}")
            }
            PreflightCause::AuthenticationFailed(reason) => {
                write!(f, "authentication failed: {reason}")
            }
            PreflightCause::TimedOut(after) => write!(f, "timed out after {after:?}"),
        }
    }
}

/// Classification of a failed rotation, carried by [`RotationState::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidIdentifier,
    InvalidMetadata,
    SecretStoreReadFailed,
    PreflightFailed,
    EntropyUnavailable,
    CredentialUpdateFailed,
    SecretStoreWriteFailed,
    MalformedNotification,
    RotationInProgress,
    LeaseUnavailable,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InvalidIdentifier => "invalid_identifier",
            FailureKind::InvalidMetadata => "invalid_metadata",
            FailureKind::SecretStoreReadFailed => "secret_store_read_failed",
            FailureKind::PreflightFailed => "preflight_failed",
            FailureKind::EntropyUnavailable => "entropy_unavailable",
            FailureKind::CredentialUpdateFailed => "credential_update_failed",
            FailureKind::SecretStoreWriteFailed => "secret_store_write_failed",
            FailureKind::MalformedNotification => "malformed_notification",
            FailureKind::RotationInProgress => "rotation_in_progress",
            FailureKind::LeaseUnavailable => "lease_unavailable",
            FailureKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Errors that abort a single rotation
#[derive(Debug, Error)]
pub enum RotationError {
    /// Vault, secret or login name failed validation
    #[error(transparent)]
    InvalidIdentifier(#[from] ValidationError),

    /// Secret tags are unusable
    #[error("invalid metadata on secret `{secret}`: {source}")]
    InvalidMetadata {
        secret: String,
        #[source]
        source: MetadataError,
    },

    /// Current secret version could not be read
    #[error("failed to read secret `{secret}`: {source}")]
    SecretStoreReadFailed {
        secret: String,
        #[source]
        source: StoreError,
    },

    /// Current credential does not work against the data service
    #[error("preflight check failed for login `{login}`: {cause}")]
    PreflightFailed { login: String, cause: PreflightCause },

    /// Operating system entropy source failed
    #[error("could not generate a new credential: {0}")]
    EntropyUnavailable(String),

    /// Data service rejected the password change
    #[error("data service rejected the new password for login `{login}`: {source}")]
    CredentialUpdateFailed {
        login: String,
        #[source]
        source: ServiceError,
    },

    /// New secret version could not be written
    #[error("failed to write a new version of `{secret}` after {attempts} attempt(s): {reason}")]
    SecretStoreWriteFailed {
        secret: String,
        attempts: u32,
        reason: String,
    },

    /// Inbound notification lacks a secret or vault name
    #[error("malformed notification: {reason}")]
    MalformedNotification { reason: String },

    /// Another rotation of the same secret holds the lease
    #[error("rotation already in progress for `{secret}`")]
    RotationInProgress { secret: String },

    /// Lease backend failed
    #[error("lease for `{secret}` unavailable: {source}")]
    LeaseUnavailable {
        secret: String,
        #[source]
        source: LockError,
    },

    /// State transition is not allowed
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: RotationState,
        to: RotationState,
    },
}

impl RotationError {
    /// Failure classification for the terminal state
    pub fn kind(&self) -> FailureKind {
        match self {
            RotationError::InvalidIdentifier(_) => FailureKind::InvalidIdentifier,
            RotationError::InvalidMetadata { .. } => FailureKind::InvalidMetadata,
            RotationError::SecretStoreReadFailed { .. } => FailureKind::SecretStoreReadFailed,
            RotationError::PreflightFailed { .. } => FailureKind::PreflightFailed,
            RotationError::EntropyUnavailable(_) => FailureKind::EntropyUnavailable,
            RotationError::CredentialUpdateFailed { .. } => FailureKind::CredentialUpdateFailed,
            RotationError::SecretStoreWriteFailed { .. } => FailureKind::SecretStoreWriteFailed,
            RotationError::MalformedNotification { .. } => FailureKind::MalformedNotification,
            RotationError::RotationInProgress { .. } => FailureKind::RotationInProgress,
            RotationError::LeaseUnavailable { .. } => FailureKind::LeaseUnavailable,
            RotationError::InvalidStateTransition { .. } => FailureKind::Internal,
        }
    }
}

/// Result type for rotation operations
pub type RotationResult<T> = Result<T, RotationError>;

/// Non-fatal failure while updating one dependent binding
#[derive(Debug, Error)]
pub enum PropagationError {
    /// Current configuration entry could not be read
    #[error("failed to read `{entry}` on `{target}`: {source}")]
    Read {
        target: String,
        entry: String,
        #[source]
        source: TargetError,
    },

    /// Updated configuration entry could not be written
    #[error("failed to write `{entry}` on `{target}`: {source}")]
    Write {
        target: String,
        entry: String,
        #[source]
        source: TargetError,
    },
}
