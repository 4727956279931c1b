//! Collaborator traits: secret store, data service, dependent targets, leases

mod lock;
mod service;
mod store;
mod target;

pub use lock::{LeaseGuard, LeaseProvider, LockError};
pub use service::{
    DataService, ServiceConnection, ServiceEndpoint, ServiceError, Statement, StatementParam,
};
pub use store::{NewSecretVersion, SecretStore, StoreError, StoredSecret};
pub use target::{TargetConfigStore, TargetError};

#[cfg(test)]
pub use store::MockSecretStore;
#[cfg(test)]
pub use target::MockTargetConfigStore;
