//! Collaborator implementations

pub mod memory;

pub use memory::{
    MemoryDataService, MemoryLeaseProvider, MemorySecretStore, MemoryTargetStore, MemoryVersion,
};
