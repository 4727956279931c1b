//! New secret versions

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

use super::error::{RotationError, RotationResult};
use super::retry::{RetryPolicy, retry_with_backoff};
use crate::core::{SecretMetadata, SecretRef};
use crate::traits::{NewSecretVersion, SecretStore};
use crate::utils::{EntropyError, generate_password};

/// Freshly generated credential and the expiry of the version that will hold it
#[derive(Debug)]
pub struct RotatedCredential {
    /// New password
    pub value: SecretString,
    /// Expiry attribute for the new version
    pub expires_on: DateTime<Utc>,
}

impl RotatedCredential {
    /// Generate a new password expiring at `expires_on`
    pub fn generate(expires_on: DateTime<Utc>) -> Result<Self, EntropyError> {
        Ok(Self {
            value: generate_password()?,
            expires_on,
        })
    }
}

/// Appends the rotated credential as the secret's new current version
#[derive(Clone)]
pub struct SecretVersionWriter {
    store: Arc<dyn SecretStore>,
    retry: RetryPolicy,
}

impl SecretVersionWriter {
    pub fn new(store: Arc<dyn SecretStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Write `credential` with `metadata` carried forward; returns the new version id
    pub async fn write(
        &self,
        secret: &SecretRef,
        metadata: &SecretMetadata,
        credential: &RotatedCredential,
    ) -> RotationResult<String> {
        let tags = metadata.to_tags();

        retry_with_backoff(&self.retry, "secret_store_write", || {
            let version = NewSecretVersion {
                value: SecretString::from(credential.value.expose_secret().to_owned()),
                tags: tags.clone(),
                expires_on: credential.expires_on,
            };
            self.store.set(secret, version)
        })
        .await
        .map_err(|exhausted| RotationError::SecretStoreWriteFailed {
            secret: secret.to_string(),
            attempts: exhausted.attempts,
            reason: exhausted.last_error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BindingPolicy, Tags, tags};
    use crate::traits::{MockSecretStore, StoreError};
    use std::time::Duration;

    fn metadata() -> SecretMetadata {
        let mut source = Tags::new();
        source.insert(tags::CREDENTIAL_ID.into(), "app_user".into());
        source.insert(tags::PROVIDER_ADDRESS.into(), "/a/b".into());
        source.insert("webapp[0]".into(), "site-a".into());
        source.insert("connstring[0]".into(), "Db".into());
        SecretMetadata::from_tags(&source, BindingPolicy::Truncate).unwrap()
    }

    fn quick_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            backoff_multiplier: 1.0,
            max_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn writes_carried_forward_tags_and_expiry() {
        let expires_on = Utc::now();
        let mut store = MockSecretStore::new();
        store
            .expect_set()
            .times(1)
            .returning(move |_, version| {
                assert_eq!(version.value.expose_secret(), "n3w");
                assert_eq!(version.expires_on, expires_on);
                assert_eq!(version.tags.get(tags::VALIDITY_PERIOD_DAYS).map(String::as_str), Some("60"));
                assert_eq!(version.tags.get("webapp[0]").map(String::as_str), Some("site-a"));
                Ok("v2".to_string())
            });

        let writer = SecretVersionWriter::new(Arc::new(store), quick_retry(3));
        let secret = SecretRef::parse("vault", "db-secret").unwrap();
        let credential = RotatedCredential {
            value: SecretString::from("n3w"),
            expires_on,
        };

        let version = writer.write(&secret, &metadata(), &credential).await.unwrap();
        assert_eq!(version, "v2");
    }

    #[tokio::test]
    async fn retries_then_reports_attempts() {
        let mut store = MockSecretStore::new();
        store
            .expect_set()
            .times(2)
            .returning(|_, _| Err(StoreError::Backend("throttled".into())));

        let writer = SecretVersionWriter::new(Arc::new(store), quick_retry(2));
        let secret = SecretRef::parse("vault", "db-secret").unwrap();
        let credential = RotatedCredential::generate(Utc::now()).unwrap();

        let err = writer.write(&secret, &metadata(), &credential).await.unwrap_err();
        match err {
            RotationError::SecretStoreWriteFailed { attempts, reason, .. } => {
                assert_eq!(attempts, 2);
                assert!(reason.contains("throttled"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
