//! Listener lifecycle

use std::future::Future;

use tokio::net::TcpListener;

use crate::config::WebhookConfig;
use crate::error::WebhookError;
use crate::handler::{WebhookState, router};

/// Bind `config.bind` and serve until Ctrl-C
pub async fn serve(config: WebhookConfig, state: WebhookState) -> Result<(), WebhookError> {
    config.validate()?;

    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| WebhookError::Bind {
            addr: config.bind,
            source,
        })?;

    serve_with_listener(listener, config, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve_with_listener<F>(
    listener: TcpListener,
    config: WebhookConfig,
    state: WebhookState,
    shutdown: F,
) -> Result<(), WebhookError>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;

    let addr = listener.local_addr().map_err(WebhookError::Serve)?;
    tracing::info!(%addr, path = %config.path, "Webhook listening");

    axum::serve(listener, router(state, &config))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(WebhookError::Serve)?;

    tracing::info!("Webhook stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
