//! Dependent consumer propagation
//!
//! Best effort: every binding is attempted, failures are recorded in the
//! [`PropagationReport`] and never reach the caller as errors.

use std::sync::Arc;

use secrecy::SecretString;
use serde::Serialize;

use super::error::PropagationError;
use crate::core::ConsumerBinding;
use crate::traits::TargetConfigStore;
use crate::utils::{ConnectionTemplate, replace_password};

/// One binding that could not be updated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingFailure {
    pub binding: ConsumerBinding,
    pub error: String,
}

/// Outcome of a propagation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    /// Bindings that were tried
    pub attempted: usize,
    /// Bindings whose configuration entry now holds the new password
    pub updated: usize,
    /// Per-binding failures, in binding order
    pub failures: Vec<BindingFailure>,
    /// Bindings left alone because no target store is configured
    pub skipped: usize,
}

impl PropagationReport {
    /// True when every attempted binding was updated
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }
}

/// Pushes the new password into dependent configuration entries
#[derive(Clone, Default)]
pub struct ConsumerPropagator {
    targets: Option<Arc<dyn TargetConfigStore>>,
}

impl ConsumerPropagator {
    /// Propagator backed by `targets`
    pub fn new(targets: Arc<dyn TargetConfigStore>) -> Self {
        Self {
            targets: Some(targets),
        }
    }

    /// Propagator with no target store; every pass is a no-op
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Update every binding in order
    ///
    /// An entry that does not exist yet is created from `template`.
    pub async fn propagate(
        &self,
        bindings: &[ConsumerBinding],
        template: &ConnectionTemplate,
        password: &SecretString,
    ) -> PropagationReport {
        let mut report = PropagationReport::default();
        if bindings.is_empty() {
            return report;
        }

        let Some(targets) = &self.targets else {
            tracing::warn!(
                bindings = bindings.len(),
                "No target configuration store configured; skipping propagation"
            );
            report.skipped = bindings.len();
            return report;
        };

        for binding in bindings {
            report.attempted += 1;
            match self
                .update_binding(targets.as_ref(), binding, template, password)
                .await
            {
                Ok(()) => {
                    report.updated += 1;
                    tracing::info!(
                        target_name = %binding.target,
                        entry = %binding.config_entry,
                        "Dependent configuration updated"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        target_name = %binding.target,
                        entry = %binding.config_entry,
                        error = %e,
                        "Failed to update dependent configuration"
                    );
                    report.failures.push(BindingFailure {
                        binding: binding.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    async fn update_binding(
        &self,
        targets: &dyn TargetConfigStore,
        binding: &ConsumerBinding,
        template: &ConnectionTemplate,
        password: &SecretString,
    ) -> Result<(), PropagationError> {
        let current = targets
            .read_config_entry(&binding.target, &binding.config_entry)
            .await
            .map_err(|source| PropagationError::Read {
                target: binding.target.clone(),
                entry: binding.config_entry.clone(),
                source,
            })?;

        let updated = match current {
            Some(value) => replace_password(&value, password),
            None => {
                tracing::debug!(
                    target_name = %binding.target,
                    entry = %binding.config_entry,
                    "Entry missing; building connection string from metadata"
                );
                template.render(password)
            }
        };

        targets
            .write_config_entry(&binding.target, &binding.config_entry, &updated)
            .await
            .map_err(|source| PropagationError::Write {
                target: binding.target.clone(),
                entry: binding.config_entry.clone(),
                source,
            })
    }
}
