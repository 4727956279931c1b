//! Rotation orchestrator
//!
//! Runs one rotation end to end under a per-secret lease:
//!
//! ```text
//! validate names → lease → read secret + metadata → probe → generate
//!     → update live login → write new version → propagate → release lease
//! ```
//!
//! The live login is changed before the new version is written, so the
//! current version in the store never holds a password the service rejects.
//! Once the service update starts the rotation runs to a terminal state.

use std::convert::Infallible;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;

use super::config::{ConfigError, ContentionPolicy, RotationConfig};
use super::error::{RotationError, RotationResult};
use super::notification::RotationNotification;
use super::prober::ConnectionProber;
use super::propagator::{ConsumerPropagator, PropagationReport};
use super::state::RotationState;
use super::updater::ServicePasswordUpdater;
use super::writer::{RotatedCredential, SecretVersionWriter};
use crate::core::{SecretMetadata, SecretRef};
use crate::providers::MemoryLeaseProvider;
use crate::traits::{
    DataService, LeaseGuard, LeaseProvider, SecretStore, ServiceEndpoint, TargetConfigStore,
};
use crate::utils::ConnectionTemplate;

/// Outcome of a completed rotation
#[derive(Debug, Clone, Serialize)]
pub struct RotationReport {
    /// `vault/secret`
    pub secret: String,
    /// Version that was current before the rotation, if the store exposes one
    pub previous_version: Option<String>,
    /// Version written by the rotation
    pub new_version: String,
    /// Expiry of the new version
    pub expires_on: DateTime<Utc>,
    /// Dependent binding results
    pub propagation: PropagationReport,
    /// States visited, in order
    pub history: Vec<RotationState>,
}

/// State of one in-flight rotation
struct RotationRun {
    secret: String,
    state: RotationState,
    history: Vec<RotationState>,
}

impl RotationRun {
    fn new(secret: String) -> Self {
        Self {
            secret,
            state: RotationState::Validating,
            history: vec![RotationState::Validating],
        }
    }

    fn advance(&mut self, next: RotationState) -> RotationResult<()> {
        self.state = self.state.transition_to(next)?;
        self.history.push(next);
        tracing::info!(secret = %self.secret, state = %next, "Rotation state changed");
        Ok(())
    }

    /// Move to `Failed` and hand the error back for propagation
    fn fail(&mut self, error: RotationError) -> RotationError {
        let diverged = self.state.has_mutated();
        let failed = RotationState::Failed(error.kind());
        match self.state.transition_to(failed) {
            Ok(state) => {
                self.state = state;
                self.history.push(state);
            }
            Err(transition) => {
                tracing::error!(
                    secret = %self.secret,
                    error = %transition,
                    "Rotation failed from a state that cannot fail"
                );
            }
        }

        tracing::error!(
            secret = %self.secret,
            kind = %error.kind(),
            error = %error,
            "Rotation failed"
        );
        if diverged {
            tracing::error!(
                secret = %self.secret,
                "Data service holds a password the secret store does not; manual reconciliation required"
            );
        }
        error
    }
}

/// Sequences a single secret rotation
#[derive(Clone)]
pub struct RotationOrchestrator {
    store: Arc<dyn SecretStore>,
    leases: Arc<dyn LeaseProvider>,
    prober: ConnectionProber,
    updater: ServicePasswordUpdater,
    writer: SecretVersionWriter,
    propagator: ConsumerPropagator,
    config: RotationConfig,
}

impl RotationOrchestrator {
    /// Create builder for constructing an orchestrator
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use keyturn_credential::prelude::*;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let orchestrator = RotationOrchestrator::builder()
    ///     .secret_store(Arc::new(MemorySecretStore::new()))
    ///     .data_service(Arc::new(MemoryDataService::new()))
    ///     .build()?;
    ///
    /// let report = orchestrator
    ///     .rotate(&RotationNotification::new("myvault", "db-login-secret"))
    ///     .await?;
    /// println!("new version {}", report.new_version);
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> RotationOrchestratorBuilder {
        RotationOrchestratorBuilder::default()
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Rotate the secret named by `notification`
    pub async fn rotate(
        &self,
        notification: &RotationNotification,
    ) -> RotationResult<RotationReport> {
        let span = tracing::info_span!(
            "rotation",
            vault = %notification.vault_name,
            secret = %notification.secret_name,
            version = %notification.secret_version,
        );

        async move {
            let mut run = RotationRun::new(format!(
                "{}/{}",
                notification.vault_name, notification.secret_name
            ));
            tracing::info!("Rotation started");

            notification.ensure_complete().map_err(|e| run.fail(e))?;
            let secret = SecretRef::parse(&notification.vault_name, &notification.secret_name)
                .map_err(|e| run.fail(e.into()))?;

            let lease = self.acquire_lease(&secret).await.map_err(|e| run.fail(e))?;
            // The rotation is never cancelled; the heartbeat only ends with it
            let outcome = tokio::select! {
                outcome = self.rotate_locked(&secret, &mut run) => outcome,
                never = self.keep_lease_alive(lease.as_ref(), &secret) => match never {},
            };

            if let Err(e) = lease.release().await {
                tracing::warn!(secret = %secret, error = %e, "Lease release failed");
            }

            if let Ok(report) = &outcome {
                tracing::info!(
                    new_version = %report.new_version,
                    expires_on = %report.expires_on,
                    bindings_updated = report.propagation.updated,
                    bindings_failed = report.propagation.failures.len(),
                    "Secret rotated successfully"
                );
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn acquire_lease(&self, secret: &SecretRef) -> RotationResult<Box<dyn LeaseGuard>> {
        let key = secret.lease_key();
        let ttl = self.config.lease_ttl;
        let in_progress = || RotationError::RotationInProgress {
            secret: secret.to_string(),
        };
        let unavailable = |source| RotationError::LeaseUnavailable {
            secret: secret.to_string(),
            source,
        };

        match &self.config.contention {
            ContentionPolicy::Skip => self
                .leases
                .try_acquire(&key, ttl)
                .await
                .map_err(unavailable)?
                .ok_or_else(in_progress),
            ContentionPolicy::Wait {
                max_wait,
                poll_interval,
            } => {
                let deadline = tokio::time::Instant::now() + *max_wait;
                loop {
                    if let Some(guard) =
                        self.leases.try_acquire(&key, ttl).await.map_err(unavailable)?
                    {
                        return Ok(guard);
                    }
                    if tokio::time::Instant::now() + *poll_interval > deadline {
                        return Err(in_progress());
                    }
                    tracing::debug!(secret = %secret, "Waiting for lease held by another rotation");
                    tokio::time::sleep(*poll_interval).await;
                }
            }
        }
    }

    /// Renew `lease` until the caller stops polling
    async fn keep_lease_alive(&self, lease: &dyn LeaseGuard, secret: &SecretRef) -> Infallible {
        let ttl = self.config.lease_ttl;
        let interval = self.config.lease_renew_interval();
        loop {
            tokio::time::sleep(interval).await;
            match lease.renew(ttl).await {
                Ok(()) => tracing::debug!(secret = %secret, "Lease renewed"),
                Err(e) => {
                    tracing::error!(
                        secret = %secret,
                        error = %e,
                        "Lease lost mid-rotation; another rotation of this secret may overlap"
                    );
                    return std::future::pending().await;
                }
            }
        }
    }

    async fn rotate_locked(
        &self,
        secret: &SecretRef,
        run: &mut RotationRun,
    ) -> RotationResult<RotationReport> {
        // Everything up to the probe is read-only
        let stored = self.store.get(secret).await.map_err(|source| {
            run.fail(RotationError::SecretStoreReadFailed {
                secret: secret.to_string(),
                source,
            })
        })?;
        tracing::info!(version = ?stored.version, "Secret info retrieved");

        let invalid_metadata = |source| RotationError::InvalidMetadata {
            secret: secret.to_string(),
            source,
        };
        let metadata = SecretMetadata::from_tags(&stored.tags, self.config.binding_policy)
            .map_err(|e| run.fail(invalid_metadata(e)))?;
        let login = metadata.login().map_err(|e| run.fail(e.into()))?;
        let provider = metadata
            .provider()
            .map_err(|e| run.fail(invalid_metadata(e)))?;
        let expires_on = metadata
            .expiry_from(Utc::now())
            .map_err(|e| run.fail(invalid_metadata(e)))?;

        let host = provider.host(&self.config.service_domain);
        tracing::info!(
            provider_address = %provider,
            credential_id = %login,
            host = %host,
            bindings = metadata.bindings.len(),
            "Metadata validated"
        );

        let endpoint = ServiceEndpoint {
            host: host.clone(),
            login: login.clone(),
            password: stored.value,
        };

        run.advance(RotationState::Probing)?;
        self.prober
            .probe(&endpoint)
            .await
            .map_err(|e| run.fail(e))?;
        tracing::info!("Service connection validated");

        run.advance(RotationState::Generating)?;
        let credential = RotatedCredential::generate(expires_on)
            .map_err(|e| run.fail(RotationError::EntropyUnavailable(e.to_string())))?;
        tracing::info!("New password generated");

        run.advance(RotationState::UpdatingService)?;
        self.updater
            .update(&endpoint, &credential.value)
            .await
            .map_err(|e| run.fail(e))?;
        tracing::info!("Password changed on data service");

        run.advance(RotationState::WritingSecret)?;
        let new_version = self
            .writer
            .write(secret, &metadata, &credential)
            .await
            .map_err(|e| run.fail(e))?;
        tracing::info!(new_version = %new_version, "New secret version written");

        run.advance(RotationState::Propagating)?;
        let template = ConnectionTemplate {
            host,
            database: provider.database_name().map(str::to_string),
            login: login.to_string(),
        };
        let propagation = self
            .propagator
            .propagate(&metadata.bindings, &template, &credential.value)
            .await;

        run.advance(RotationState::Done)?;

        Ok(RotationReport {
            secret: secret.to_string(),
            previous_version: stored.version,
            new_version,
            expires_on: credential.expires_on,
            propagation,
            history: std::mem::take(&mut run.history),
        })
    }
}

/// Builder for [`RotationOrchestrator`]
#[derive(Default)]
pub struct RotationOrchestratorBuilder {
    store: Option<Arc<dyn SecretStore>>,
    service: Option<Arc<dyn DataService>>,
    leases: Option<Arc<dyn LeaseProvider>>,
    targets: Option<Arc<dyn TargetConfigStore>>,
    config: RotationConfig,
}

impl RotationOrchestratorBuilder {
    /// Secret store holding the rotated secret (required)
    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Data service hosting the login (required)
    pub fn data_service(mut self, service: Arc<dyn DataService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Lease provider; defaults to an in-process [`MemoryLeaseProvider`]
    pub fn lease_provider(mut self, leases: Arc<dyn LeaseProvider>) -> Self {
        self.leases = Some(leases);
        self
    }

    /// Dependent target store; without one propagation is skipped
    pub fn target_store(mut self, targets: Arc<dyn TargetConfigStore>) -> Self {
        self.targets = Some(targets);
        self
    }

    pub fn config(mut self, config: RotationConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and build the orchestrator
    pub fn build(self) -> Result<RotationOrchestrator, ConfigError> {
        self.config.validate()?;

        let store = self.store.ok_or_else(|| ConfigError::MissingRequired {
            field: "secret_store".into(),
        })?;
        let service = self.service.ok_or_else(|| ConfigError::MissingRequired {
            field: "data_service".into(),
        })?;
        let leases = self
            .leases
            .unwrap_or_else(|| Arc::new(MemoryLeaseProvider::new()));
        let propagator = match self.targets {
            Some(targets) => ConsumerPropagator::new(targets),
            None => ConsumerPropagator::disabled(),
        };

        Ok(RotationOrchestrator {
            prober: ConnectionProber::new(service.clone(), self.config.probe_timeout),
            updater: ServicePasswordUpdater::new(service),
            writer: SecretVersionWriter::new(store.clone(), self.config.store_write_retry.clone()),
            store,
            leases,
            propagator,
            config: self.config,
        })
    }
}
