//! Per-secret leases
//!
//! A lease keeps two rotations of the same secret from overlapping. The
//! in-process [`MemoryLeaseProvider`](crate::providers::MemoryLeaseProvider)
//! covers a single instance; scaled-out deployments plug in a provider backed
//! by shared storage.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Error type for lease operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("lease was lost")]
    Lost,

    #[error("lease backend error: {0}")]
    Backend(String),
}

/// Held lease; releasing it lets the next rotation of the same secret run
#[async_trait]
pub trait LeaseGuard: Send + Sync {
    /// Extend the lease to `ttl` from now
    ///
    /// Fails with [`LockError::Lost`] once the lease expired and another
    /// holder took it.
    async fn renew(&self, ttl: Duration) -> Result<(), LockError>;

    /// Release the lease explicitly
    async fn release(self: Box<Self>) -> Result<(), LockError>;
}

/// Source of advisory, expiring leases
#[async_trait]
pub trait LeaseProvider: Send + Sync {
    /// Try to take the lease for `key` without waiting
    ///
    /// Returns `Ok(None)` when another holder has it.
    async fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<Box<dyn LeaseGuard>>, LockError>;
}
