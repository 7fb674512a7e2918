//! Error types for the deploy agent

use thiserror::Error;

/// Error type for the agent shell: settings, logging and the HTTP server.
///
/// Pipeline failures have their own taxonomy in [`crate::deploy::error`].
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),
}
