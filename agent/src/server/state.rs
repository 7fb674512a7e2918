//! Server state

use std::sync::Arc;

use crate::deploy::pipeline::DeploymentPipeline;

/// Server state shared across handlers
pub struct ServerState {
    pub pipeline: Arc<DeploymentPipeline>,
}

impl ServerState {
    pub fn new(pipeline: Arc<DeploymentPipeline>) -> Self {
        Self { pipeline }
    }
}
