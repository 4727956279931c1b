//! Keyturn Credential - event-driven database password rotation
//!
//! Rotates a data-service login password held in a versioned secret store and
//! pushes the new value to the applications that embed it.
//!
//! # Features
//!
//! - **Validated identifiers** - vault, secret and login names are checked before any I/O
//! - **Typed metadata** - secret tags become [`SecretMetadata`] with defaults and bindings
//! - **Safe ordering** - the live login changes before the new secret version is written
//! - **Failure isolation** - one bad binding or notification never aborts the rest
//! - **Per-secret leases** - concurrent rotations of the same secret are serialized
#![deny(unsafe_code)]
#![forbid(unsafe_code)]

/// Identifiers, provider address, metadata and their errors
pub mod core;
/// In-memory collaborator implementations
pub mod providers;
/// The rotation workflow
pub mod rotation;
/// Collaborator traits: secret store, data service, targets, leases
pub mod traits;
/// Validation, generation and connection-string helpers
pub mod utils;

// ── Root re-exports ─────────────────────────────────────────────────────────
// Commonly-used types available directly as `keyturn_credential::TypeName`.

// Core types & errors
pub use crate::core::{
    BindingPolicy, ConsumerBinding, IdentifierKind, LoginName, MetadataError, ProviderAddress,
    SecretMetadata, SecretName, SecretRef, Tags, ValidationError, VaultName,
};

// Traits
pub use crate::traits::{
    DataService, LeaseGuard, LeaseProvider, LockError, SecretStore, ServiceError, StoreError,
    TargetConfigStore, TargetError,
};

// Rotation
pub use crate::rotation::{
    BatchProcessor, BatchSummary, FailureKind, RotationConfig, RotationError,
    RotationNotification, RotationOrchestrator, RotationReport, RotationResult, RotationState,
};

/// Commonly used types and traits
pub mod prelude {
    // Core types
    pub use crate::core::{
        BindingPolicy, ConsumerBinding, LoginName, ProviderAddress, SecretMetadata, SecretRef,
        Tags,
    };

    // Rotation types
    pub use crate::rotation::{
        BatchProcessor, BatchSummary, ConfigError, ContentionPolicy, FailureKind, PayloadError,
        RetryPolicy, RotationConfig, RotationError, RotationNotification, RotationOrchestrator,
        RotationReport, RotationResult, RotationState,
    };

    // Traits
    pub use crate::traits::{
        DataService, LeaseGuard, LeaseProvider, LockError, NewSecretVersion, SecretStore,
        ServiceConnection, ServiceEndpoint, ServiceError, StoreError, StoredSecret,
        TargetConfigStore, TargetError,
    };

    // In-memory collaborators
    pub use crate::providers::{
        MemoryDataService, MemoryLeaseProvider, MemorySecretStore, MemoryTargetStore,
    };
}
