//! Application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::deploy::error::PipelineError;
use crate::deploy::pipeline::DeploymentPipeline;
use crate::errors::AgentError;
use crate::models::deployment::{DeploymentReport, DeploymentSpec};
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the HTTP trigger until `shutdown_signal` resolves
pub async fn run(
    agent_version: String,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AgentError> {
    info!("Initializing deploy agent {}...", agent_version);

    let pipeline = Arc::new(DeploymentPipeline::new(&options.pipeline));
    let server_state = Arc::new(ServerState::new(pipeline));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_handle = serve(&options.server, server_state, async move {
        let _ = shutdown_rx.await;
    })
    .await?;

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(options.max_shutdown_delay, server_handle).await {
        Ok(joined) => joined.map_err(|e| AgentError::ServerError(e.to_string()))??,
        Err(_) => {
            error!(
                "Shutdown timed out after {:?}, abandoning in-flight requests",
                options.max_shutdown_delay
            );
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Run a single deployment without the HTTP server
pub async fn deploy_once(
    options: &AppOptions,
    spec: &DeploymentSpec,
) -> Result<DeploymentReport, PipelineError> {
    DeploymentPipeline::new(&options.pipeline).run(spec).await
}
