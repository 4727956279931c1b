//! Core types: identifiers, provider address, metadata and their errors

mod error;
mod id;
mod metadata;
mod provider;

pub use error::{IdentifierKind, MetadataError, ValidationError};
pub use id::{LoginName, SecretName, SecretRef, VaultName};
pub use metadata::{
    BindingPolicy, ConsumerBinding, DEFAULT_VALIDITY_PERIOD_DAYS, SecretMetadata, Tags, tags,
};
pub use provider::ProviderAddress;
