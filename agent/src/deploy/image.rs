//! Image building

use std::path::Path;

use tracing::{debug, info};

use crate::deploy::docker::ContainerEngine;
use crate::deploy::error::DeployError;

/// Builds an image from a fetched workspace
#[derive(Clone)]
pub struct ImageBuilder {
    engine: ContainerEngine,
}

impl ImageBuilder {
    pub fn new(engine: ContainerEngine) -> Self {
        Self { engine }
    }

    /// Fail with `InvalidSpec` unless the image name is usable
    pub fn check_image_name(image_name: &str) -> Result<(), DeployError> {
        if image_name.trim().is_empty() {
            return Err(DeployError::InvalidSpec(
                "image name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Build `image_name` using `workspace` as the build context.
    ///
    /// A missing build descriptor surfaces as an engine failure.
    pub async fn build(&self, image_name: &str, workspace: &Path) -> Result<(), DeployError> {
        Self::check_image_name(image_name)?;

        info!(
            "Building image {} from {}",
            image_name,
            workspace.display()
        );
        let output = self
            .engine
            .build(image_name, workspace)
            .await
            .map_err(DeployError::BuildFailed)?;

        debug!("{} build output: {}", self.engine.program(), output.trim());
        Ok(())
    }
}
