//! Bearer tokens for the Key Vault API

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Token acquisition failed
#[derive(Debug, Error)]
#[error("could not acquire an access token: {0}")]
pub struct TokenError(pub String);

/// Source of bearer tokens, asked once per request
///
/// Managed identities refresh their tokens on their own schedule; implement
/// this over whichever identity the host runs with.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<SecretString, TokenError>;
}

/// A fixed token, e.g. injected by the hosting environment
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: SecretString) -> Self {
        Self(token)
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<SecretString, TokenError> {
        Ok(SecretString::from(self.0.expose_secret().to_owned()))
    }
}
