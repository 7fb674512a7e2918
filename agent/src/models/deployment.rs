//! Deployment models

use chrono::{DateTime, Utc};
use openapi_server::models::DeployRequest;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::deploy::workspace::DEFAULT_BRANCH;

/// Port mapping applied when neither the request nor the settings give one
pub const DEFAULT_PORT_MAPPING: &str = "8080:8080";

/// Suffix appended to the image name when no container name is given
pub const CONTAINER_NAME_SUFFIX: &str = "-container";

/// Input to one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    /// Remote repository address
    pub repo_address: String,

    /// Branch to clone, `main` when empty
    pub branch: String,

    /// Explicit workspace directory, derived when empty
    pub work_dir: String,

    /// Image to build
    pub image_name: String,

    /// Container to replace, `<image_name>-container` when empty
    pub container_name: String,

    /// `<host>:<container>` port mapping, the configured default when empty
    pub port_mapping: String,
}

impl DeploymentSpec {
    pub fn new(repo_address: impl Into<String>, image_name: impl Into<String>) -> Self {
        Self {
            repo_address: repo_address.into(),
            image_name: image_name.into(),
            ..Default::default()
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<String>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_container_name(mut self, container_name: impl Into<String>) -> Self {
        self.container_name = container_name.into();
        self
    }

    pub fn with_port_mapping(mut self, port_mapping: impl Into<String>) -> Self {
        self.port_mapping = port_mapping.into();
        self
    }

    pub fn branch(&self) -> &str {
        non_empty(&self.branch).unwrap_or(DEFAULT_BRANCH)
    }

    pub fn work_dir(&self) -> Option<&str> {
        non_empty(&self.work_dir)
    }

    pub fn container_name(&self) -> String {
        match non_empty(&self.container_name) {
            Some(name) => name.to_string(),
            None => format!("{}{}", self.image_name, CONTAINER_NAME_SUFFIX),
        }
    }

    pub fn port_mapping<'a>(&'a self, default: &'a str) -> &'a str {
        non_empty(&self.port_mapping).unwrap_or(default)
    }
}

impl From<DeployRequest> for DeploymentSpec {
    fn from(req: DeployRequest) -> Self {
        Self {
            repo_address: req.repo_url,
            branch: req.branch,
            work_dir: req.local_dir,
            image_name: req.image_name,
            container_name: req.container_name,
            port_mapping: req.port_mapping,
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// Outcome of a successful pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub run_id: Uuid,
    pub work_dir: PathBuf,
    pub image_name: String,
    pub container_name: String,
    pub port_mapping: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
