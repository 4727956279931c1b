//! Keyturn Key Vault - REST secret store
//!
//! Implements [`SecretStore`](keyturn_credential::SecretStore) against the
//! Key Vault secrets API (`GET`/`PUT /secrets/{name}`), so the rotation
//! workflow can read the current version and append new ones.
//!
//! ```no_run
//! use std::sync::Arc;
//! use keyturn_keyvault::{KeyVaultConfig, KeyVaultSecretStore, StaticToken};
//! use secrecy::SecretString;
//!
//! # fn example(token: String) -> Result<(), Box<dyn std::error::Error>> {
//! let store = KeyVaultSecretStore::new(
//!     KeyVaultConfig::default(),
//!     Arc::new(StaticToken::new(SecretString::from(token))),
//! )?;
//! # let _ = store;
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]
#![forbid(unsafe_code)]

mod client;
mod config;
mod token;

pub use client::KeyVaultSecretStore;
pub use config::KeyVaultConfig;
pub use token::{StaticToken, TokenError, TokenProvider};
