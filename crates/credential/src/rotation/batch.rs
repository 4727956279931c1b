//! Batch processing of rotation notifications
//!
//! A batch never fails because of one notification: every outcome is logged
//! and counted, and the caller only learns whether the payload was readable.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;

use super::error::FailureKind;
use super::notification::{PayloadError, RotationNotification, parse_payload};
use super::orchestrator::RotationOrchestrator;

/// Per-batch counters, for logging only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub received: usize,
    pub rotated: usize,
    pub failed: usize,
    pub malformed: usize,
    pub in_progress: usize,
}

enum Outcome {
    Rotated,
    Failed,
    Malformed,
    InProgress,
}

impl BatchSummary {
    fn record(mut self, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Rotated => self.rotated += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Malformed => self.malformed += 1,
            Outcome::InProgress => self.in_progress += 1,
        }
        self
    }
}

/// Runs the orchestrator once per notification with bounded concurrency
#[derive(Clone)]
pub struct BatchProcessor {
    orchestrator: Arc<RotationOrchestrator>,
    max_concurrency: usize,
}

impl BatchProcessor {
    /// Concurrency comes from the orchestrator's configuration
    pub fn new(orchestrator: Arc<RotationOrchestrator>) -> Self {
        let max_concurrency = orchestrator.config().max_concurrency;
        Self {
            orchestrator,
            max_concurrency,
        }
    }

    /// Override concurrency; `1` processes notifications sequentially
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Parse a raw body and process its events
    pub async fn handle_payload(&self, body: &[u8]) -> Result<BatchSummary, PayloadError> {
        let events = parse_payload(body).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejecting rotation payload");
        })?;
        Ok(self.process(&events).await)
    }

    /// Process every event; individual failures are logged and counted
    pub async fn process(&self, events: &[Value]) -> BatchSummary {
        tracing::info!(events = events.len(), "Processing rotation batch");

        let summary = futures::stream::iter(events.iter().enumerate())
            .map(|(index, event)| self.process_one(index, event))
            .buffer_unordered(self.max_concurrency.max(1))
            .boxed()
            .fold(
                BatchSummary {
                    received: events.len(),
                    ..BatchSummary::default()
                },
                |summary, outcome| async move { summary.record(outcome) },
            )
            .await;

        tracing::info!(
            received = summary.received,
            rotated = summary.rotated,
            failed = summary.failed,
            malformed = summary.malformed,
            in_progress = summary.in_progress,
            "Rotation batch finished"
        );
        summary
    }

    async fn process_one(&self, index: usize, event: &Value) -> Outcome {
        let notification = RotationNotification::from_event(event);
        tracing::info!(
            index,
            vault = %notification.vault_name,
            secret = %notification.secret_name,
            version = %notification.secret_version,
            "Rotation notification received"
        );

        if let Err(e) = notification.ensure_complete() {
            tracing::warn!(index, error = %e, "Skipping notification");
            return Outcome::Malformed;
        }

        match self.orchestrator.rotate(&notification).await {
            Ok(_) => Outcome::Rotated,
            Err(e) => match e.kind() {
                FailureKind::RotationInProgress => Outcome::InProgress,
                FailureKind::MalformedNotification => Outcome::Malformed,
                _ => Outcome::Failed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SecretRef, Tags, tags};
    use crate::providers::{MemoryDataService, MemorySecretStore};
    use serde_json::json;

    const HOST: &str = "mydb.database.windows.net";

    fn processor() -> (Arc<MemorySecretStore>, BatchProcessor) {
        let store = Arc::new(MemorySecretStore::new());
        let service = MemoryDataService::new();
        service.add_login(HOST, "app_user", "old");

        let mut tags = Tags::new();
        tags.insert(tags::CREDENTIAL_ID.into(), "app_user".into());
        tags.insert(
            tags::PROVIDER_ADDRESS.into(),
            "/subscriptions/x/resourceGroups/y/providers/Microsoft.Sql/servers/mydb".into(),
        );
        store.insert(&SecretRef::parse("myvault", "db-secret").unwrap(), "old", tags);

        let orchestrator = RotationOrchestrator::builder()
            .secret_store(store.clone())
            .data_service(Arc::new(service))
            .build()
            .unwrap();
        (store, BatchProcessor::new(Arc::new(orchestrator)))
    }

    #[tokio::test]
    async fn malformed_event_does_not_stop_the_batch() {
        let (store, processor) = processor();
        let events = vec![
            json!({ "subject": "", "topic": "/x/vaults/myvault" }),
            json!({ "subject": "db-secret", "topic": "/x/vaults/myvault", "data": { "Version": "abc" } }),
        ];

        let summary = processor.process(&events).await;

        assert_eq!(
            summary,
            BatchSummary {
                received: 2,
                rotated: 1,
                failed: 0,
                malformed: 1,
                in_progress: 0,
            }
        );
        let secret = SecretRef::parse("myvault", "db-secret").unwrap();
        assert_eq!(store.version_count(&secret), 2);
    }

    #[tokio::test]
    async fn failed_rotation_is_counted_not_raised() {
        let (_, processor) = processor();
        let events = vec![json!({ "subject": "unknown", "topic": "/x/vaults/myvault" })];

        let summary = processor.with_max_concurrency(1).process(&events).await;
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn unreadable_payload_is_rejected() {
        let (_, processor) = processor();
        assert_eq!(
            processor.handle_payload(b"").await,
            Err(PayloadError::Empty)
        );
        assert!(processor.handle_payload(b"{}").await.is_err());
        assert_eq!(
            processor.handle_payload(b"[]").await,
            Ok(BatchSummary::default())
        );
    }
}
