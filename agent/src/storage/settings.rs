//! Settings file management

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::app::options::{AppOptions, ServerOptions};
use crate::deploy::locator::DEFAULT_KNOWN_HOSTS;
use crate::deploy::pipeline::PipelineSettings;
use crate::errors::AgentError;
use crate::logs::{LogLevel, LogOptions};
use crate::models::deployment::DEFAULT_PORT_MAPPING;

/// Agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Directory for a daily rolling log file, stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Deployment configuration
    #[serde(default)]
    pub deploy: DeploySettings,

    /// Seconds to wait for in-flight requests on shutdown
    #[serde(default = "default_shutdown_delay")]
    pub shutdown_delay_secs: u64,
}

fn default_shutdown_delay() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            deploy: DeploySettings::default(),
            shutdown_delay_secs: default_shutdown_delay(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).await.map_err(|e| {
            AgentError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self.log_level.clone(),
            json_format: self.log_json,
            log_dir: self.log_dir.clone(),
            ..Default::default()
        }
    }

    pub fn app_options(&self) -> AppOptions {
        AppOptions {
            server: ServerOptions {
                host: self.server.host.clone(),
                port: self.server.port,
            },
            pipeline: PipelineSettings {
                workspace_root: self.deploy.workspace_root.clone(),
                default_port_mapping: self.deploy.default_port_mapping.clone(),
                known_hosts: self.deploy.known_hosts.clone(),
                git_program: self.deploy.git_program.clone(),
                engine_program: self.deploy.engine_program.clone(),
                clone_timeout: Duration::from_secs(self.deploy.clone_timeout_secs),
                build_timeout: Duration::from_secs(self.deploy.build_timeout_secs),
                container_timeout: Duration::from_secs(self.deploy.container_timeout_secs),
            },
            max_shutdown_delay: Duration::from_secs(self.shutdown_delay_secs),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9099
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Deployment pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySettings {
    /// Directory that workspaces are cloned under
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Port mapping for requests without one
    #[serde(default = "default_port_mapping")]
    pub default_port_mapping: String,

    /// Hosts accepted in repository addresses
    #[serde(default = "default_known_hosts")]
    pub known_hosts: Vec<String>,

    #[serde(default = "default_git_program")]
    pub git_program: String,

    /// `docker`, `podman` or another compatible CLI
    #[serde(default = "default_engine_program")]
    pub engine_program: String,

    #[serde(default = "default_clone_timeout")]
    pub clone_timeout_secs: u64,

    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: u64,

    #[serde(default = "default_container_timeout")]
    pub container_timeout_secs: u64,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_port_mapping() -> String {
    DEFAULT_PORT_MAPPING.to_string()
}

fn default_known_hosts() -> Vec<String> {
    DEFAULT_KNOWN_HOSTS.iter().map(|h| h.to_string()).collect()
}

fn default_git_program() -> String {
    "git".to_string()
}

fn default_engine_program() -> String {
    "docker".to_string()
}

fn default_clone_timeout() -> u64 {
    600
}

fn default_build_timeout() -> u64 {
    1800
}

fn default_container_timeout() -> u64 {
    120
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            default_port_mapping: default_port_mapping(),
            known_hosts: default_known_hosts(),
            git_program: default_git_program(),
            engine_program: default_engine_program(),
            clone_timeout_secs: default_clone_timeout(),
            build_timeout_secs: default_build_timeout(),
            container_timeout_secs: default_container_timeout(),
        }
    }
}
