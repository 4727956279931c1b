//! Key Vault secret store over REST

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyturn_credential::rotation::ConfigError;
use keyturn_credential::{SecretRef, SecretStore, StoreError, Tags};
use keyturn_credential::traits::{NewSecretVersion, StoredSecret};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::KeyVaultConfig;
use crate::token::TokenProvider;

/// Secret bundle as returned by `GET`/`PUT /secrets/{name}`
#[derive(Deserialize)]
struct SecretBundle {
    value: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    tags: Option<Tags>,
    #[serde(default)]
    attributes: Option<BundleAttributes>,
}

#[derive(Deserialize)]
struct BundleAttributes {
    #[serde(default)]
    exp: Option<i64>,
}

#[derive(Serialize)]
struct SetSecretRequest<'a> {
    value: &'a str,
    tags: &'a Tags,
    attributes: SetAttributes,
}

#[derive(Serialize)]
struct SetAttributes {
    enabled: bool,
    exp: i64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// [`SecretStore`] backed by the Key Vault REST API
///
/// Reads the current version with `GET /secrets/{name}` and appends a new
/// version with `PUT /secrets/{name}`, authenticating every request with a
/// bearer token from the configured [`TokenProvider`].
pub struct KeyVaultSecretStore {
    http: Client,
    config: KeyVaultConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl KeyVaultSecretStore {
    /// Create a store after validating `config`
    pub fn new(
        config: KeyVaultConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::ValidationFailed(format!("http client: {e}")))?;

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    pub fn config(&self) -> &KeyVaultConfig {
        &self.config
    }

    fn secret_url(&self, secret: &SecretRef) -> Result<Url, StoreError> {
        let base = self.config.vault_url(secret.vault.as_str());
        let mut url = Url::parse(&base)
            .map_err(|e| StoreError::Backend(format!("invalid vault url `{base}`: {e}")))?;

        url.path_segments_mut()
            .map_err(|()| StoreError::Backend(format!("vault url `{base}` cannot be a base")))?
            .pop_if_empty()
            .push("secrets")
            .push(secret.name.as_str());
        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version);

        Ok(url)
    }

    async fn bearer(&self) -> Result<SecretString, StoreError> {
        self.tokens
            .token()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl SecretStore for KeyVaultSecretStore {
    async fn get(&self, secret: &SecretRef) -> Result<StoredSecret, StoreError> {
        let url = self.secret_url(secret)?;
        let token = self.bearer().await?;

        tracing::debug!(secret = %secret, "Reading current secret version");

        let response = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let bundle = read_bundle(secret, response).await?;
        let version = bundle.id.as_deref().and_then(version_from_id);

        Ok(StoredSecret {
            value: SecretString::from(bundle.value),
            tags: bundle.tags.unwrap_or_default(),
            expires_on: bundle
                .attributes
                .and_then(|a| a.exp)
                .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0)),
            version,
        })
    }

    async fn set(
        &self,
        secret: &SecretRef,
        version: NewSecretVersion,
    ) -> Result<String, StoreError> {
        let url = self.secret_url(secret)?;
        let token = self.bearer().await?;

        let body = SetSecretRequest {
            value: version.value.expose_secret(),
            tags: &version.tags,
            attributes: SetAttributes {
                enabled: true,
                exp: version.expires_on.timestamp(),
            },
        };

        tracing::debug!(
            secret = %secret,
            expires_on = %version.expires_on,
            "Writing new secret version"
        );

        let response = self
            .http
            .put(url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let bundle = read_bundle(secret, response).await?;
        bundle
            .id
            .as_deref()
            .and_then(version_from_id)
            .ok_or_else(|| StoreError::Backend("response carried no version id".into()))
    }
}

async fn read_bundle(secret: &SecretRef, response: Response) -> Result<SecretBundle, StoreError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<SecretBundle>()
            .await
            .map_err(|e| StoreError::Backend(format!("unreadable secret bundle: {e}")));
    }

    let text = response.text().await.unwrap_or_default();
    Err(classify(secret, status, &text))
}

fn classify(secret: &SecretRef, status: StatusCode, body: &str) -> StoreError {
    if status == StatusCode::NOT_FOUND {
        return StoreError::NotFound {
            secret: secret.to_string(),
        };
    }

    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| match (envelope.error.code, envelope.error.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (code, message) => message.or(code),
        })
        .unwrap_or_else(|| body.trim().to_string());

    if status.is_client_error() {
        StoreError::Rejected {
            status: status.as_u16(),
            message,
        }
    } else {
        StoreError::Backend(format!("status {}: {message}", status.as_u16()))
    }
}

/// Last path segment of a secret id (`.../secrets/{name}/{version}`)
fn version_from_id(id: &str) -> Option<String> {
    id.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::StaticToken;

    fn store(config: KeyVaultConfig) -> KeyVaultSecretStore {
        KeyVaultSecretStore::new(
            config,
            Arc::new(StaticToken::new(SecretString::from("token"))),
        )
        .unwrap()
    }

    fn secret() -> SecretRef {
        SecretRef::parse("myvault", "db-login-secret").unwrap()
    }

    #[test]
    fn url_from_template() {
        let url = store(KeyVaultConfig::default()).secret_url(&secret()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://myvault.vault.azure.net/secrets/db-login-secret?api-version=7.4"
        );
    }

    #[test]
    fn url_from_override_with_trailing_slash() {
        let url = store(KeyVaultConfig::with_endpoint("http://127.0.0.1:9000/"))
            .secret_url(&secret())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/secrets/db-login-secret?api-version=7.4"
        );
    }

    #[test]
    fn version_is_last_segment() {
        assert_eq!(
            version_from_id("https://v.vault.azure.net/secrets/s/4387e9f3d6e14c459867679a90fd0f79"),
            Some("4387e9f3d6e14c459867679a90fd0f79".to_string())
        );
        assert_eq!(version_from_id(""), None);
    }

    #[test]
    fn client_errors_are_rejections() {
        let err = classify(
            &secret(),
            StatusCode::FORBIDDEN,
            r#"{"error":{"code":"Forbidden","message":"no set permission"}}"#,
        );
        match err {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Forbidden: no set permission");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn server_errors_are_backend_failures() {
        let err = classify(&secret(), StatusCode::SERVICE_UNAVAILABLE, "busy");
        assert!(matches!(err, StoreError::Backend(ref m) if m.contains("503") && m.contains("busy")));
    }

    #[test]
    fn missing_secret_is_not_found() {
        let err = classify(&secret(), StatusCode::NOT_FOUND, "");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
