//! Preflight probe
//!
//! Opens and closes a connection with the current credential before anything
//! is mutated, so a service that is already broken is never rotated.

use std::sync::Arc;
use std::time::Duration;

use super::error::{PreflightCause, RotationError, RotationResult};
use crate::traits::{DataService, ServiceEndpoint, ServiceError};

/// Checks that the current credential still authenticates
#[derive(Clone)]
pub struct ConnectionProber {
    service: Arc<dyn DataService>,
    timeout: Duration,
}

impl ConnectionProber {
    /// Create a prober bounded by `timeout`
    pub fn new(service: Arc<dyn DataService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Probe `endpoint`; no connection outlives the call
    pub async fn probe(&self, endpoint: &ServiceEndpoint) -> RotationResult<()> {
        let attempt = async {
            let connection = self.service.connect(endpoint).await?;
            if let Err(e) = connection.close().await {
                tracing::debug!(host = %endpoint.host, error = %e, "Probe connection close failed");
            }
            Ok::<(), ServiceError>(())
        };

        let cause = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(ServiceError::AuthenticationFailed { host, login })) => {
                PreflightCause::AuthenticationFailed(format!("login `{login}` rejected by `{host}`"))
            }
            Ok(Err(other)) => PreflightCause::ServiceUnreachable(other.to_string()),
            Err(_) => PreflightCause::TimedOut(self.timeout),
        };

        Err(RotationError::PreflightFailed {
            login: endpoint.login.to_string(),
            cause,
        })
    }
}
