//! Credential rotation
//!
//! The workflow that turns a rotation notification into a new password on
//! the data service, a new secret version, and refreshed dependent
//! configuration.
//!
//! # Example
//!
//! ```no_run
//! use keyturn_credential::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(body: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = RotationOrchestrator::builder()
//!     .secret_store(Arc::new(MemorySecretStore::new()))
//!     .data_service(Arc::new(MemoryDataService::new()))
//!     .config(RotationConfig::default())
//!     .build()?;
//!
//! let summary = BatchProcessor::new(Arc::new(orchestrator))
//!     .handle_payload(body)
//!     .await?;
//! println!("{} rotated, {} failed", summary.rotated, summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod notification;
pub mod orchestrator;
pub mod prober;
pub mod propagator;
pub mod retry;
pub mod state;
pub mod updater;
pub mod writer;

pub use batch::{BatchProcessor, BatchSummary};
pub use config::{ConfigError, ContentionPolicy, MIN_LEASE_TTL, RotationConfig};
pub use error::{FailureKind, PreflightCause, PropagationError, RotationError, RotationResult};
pub use notification::{PayloadError, RotationNotification, parse_payload};
pub use orchestrator::{RotationOrchestrator, RotationOrchestratorBuilder, RotationReport};
pub use prober::ConnectionProber;
pub use propagator::{BindingFailure, ConsumerPropagator, PropagationReport};
pub use retry::{RetryExhausted, RetryPolicy, retry_with_backoff};
pub use state::RotationState;
pub use updater::{NEW_PASSWORD_PARAM, ServicePasswordUpdater, alter_login_statement, quote_identifier};
pub use writer::{RotatedCredential, SecretVersionWriter};
