//! Finite State Machine for a single pipeline run

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Repository address parsing
    Locate,

    /// Workspace directory allocation
    Workspace,

    /// git clone
    Fetch,

    /// Image build
    Build,

    /// Container replacement
    Replace,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Locate => "locate",
            Stage::Workspace => "workspace",
            Stage::Fetch => "fetch",
            Stage::Build => "build",
            Stage::Replace => "replace",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress marker of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    NotStarted,
    Cloned,
    ImageBuilt,
    ContainerRunning,
    Failed,
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// Repository cloned into the workspace
    Cloned,

    /// Image built from the workspace
    ImageBuilt,

    /// Replacement container started
    ContainerStarted,

    /// A stage failed
    Failed(String),
}

/// State of one pipeline run.
///
/// Owned by the run that created it; never shared between runs.
#[derive(Debug, Clone)]
pub struct PipelineState {
    state: DeploymentState,
    work_dir: Option<PathBuf>,
    container_name: Option<String>,
    error: Option<String>,
}

impl PipelineState {
    /// Create a new run in the `NotStarted` state
    pub fn new() -> Self {
        Self {
            state: DeploymentState::NotStarted,
            work_dir: None,
            container_name: None,
            error: None,
        }
    }

    pub fn state(&self) -> DeploymentState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    pub fn container_name(&self) -> Option<&str> {
        self.container_name.as_deref()
    }

    pub fn set_work_dir(&mut self, dir: impl Into<PathBuf>) {
        self.work_dir = Some(dir.into());
    }

    pub fn set_container_name(&mut self, name: impl Into<String>) {
        self.container_name = Some(name.into());
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            DeploymentState::ContainerRunning | DeploymentState::Failed
        )
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeploymentEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (DeploymentState::NotStarted, DeploymentEvent::Cloned) => DeploymentState::Cloned,
            (DeploymentState::Cloned, DeploymentEvent::ImageBuilt) => DeploymentState::ImageBuilt,
            (DeploymentState::ImageBuilt, DeploymentEvent::ContainerStarted) => {
                DeploymentState::ContainerRunning
            }

            // Any stage may fail until the run is over
            (
                DeploymentState::NotStarted
                | DeploymentState::Cloned
                | DeploymentState::ImageBuilt,
                DeploymentEvent::Failed(err),
            ) => {
                self.error = Some(err.clone());
                DeploymentState::Failed
            }

            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
