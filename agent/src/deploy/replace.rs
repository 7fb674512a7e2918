//! Idempotent container replacement

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::deploy::docker::ContainerEngine;
use crate::deploy::error::DeployError;

/// Per container name locks, so replacements of one name never interleave
#[derive(Debug, Default, Clone)]
pub struct ContainerLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl ContainerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `name`
    pub async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}

/// Replaces any container of a given name with a fresh one
#[derive(Clone)]
pub struct ContainerReplacer {
    engine: ContainerEngine,
    locks: ContainerLocks,
}

impl ContainerReplacer {
    pub fn new(engine: ContainerEngine) -> Self {
        Self {
            engine,
            locks: ContainerLocks::new(),
        }
    }

    /// Leave exactly one container named `container_name` running `image_name`.
    ///
    /// An existing container of that name is stopped (best effort) and removed
    /// (required) before the new one is started.
    pub async fn replace(
        &self,
        container_name: &str,
        image_name: &str,
        port_mapping: &str,
    ) -> Result<(), DeployError> {
        let _guard = self.locks.acquire(container_name).await;

        let exists = self
            .engine
            .container_exists(container_name)
            .await
            .map_err(DeployError::ReplaceFailed)?;

        if exists {
            info!(
                "Found existing container {}, stopping and removing it",
                container_name
            );

            // May already be stopped
            if let Err(e) = self.engine.stop(container_name).await {
                warn!("Failed to stop container {}: {}", container_name, e);
            }

            self.engine
                .remove(container_name)
                .await
                .map_err(DeployError::ReplaceFailed)?;
            info!("Removed old container {}", container_name);
        }

        let output = self
            .engine
            .run_detached(container_name, image_name, port_mapping)
            .await
            .map_err(DeployError::RunFailed)?;
        debug!("Container id: {}", output.trim());

        info!(
            "Started container {} (image: {}, ports: {})",
            container_name, image_name, port_mapping
        );
        Ok(())
    }
}
