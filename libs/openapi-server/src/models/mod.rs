//! Agent API models

use serde::{Deserialize, Deserializer, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Deployment request body for `POST /app/v1/deploy`.
///
/// Every field is optional on the wire. A missing or `null` field binds to an
/// empty string and the deployment pipeline applies its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployRequest {
    /// Git repository address, e.g. `https://github.com/acme/widget.git`
    #[serde(deserialize_with = "null_as_empty")]
    pub repo_url: String,

    /// Branch to clone
    #[serde(deserialize_with = "null_as_empty")]
    pub branch: String,

    /// Explicit local workspace directory
    #[serde(deserialize_with = "null_as_empty")]
    pub local_dir: String,

    /// Image tag to build
    #[serde(deserialize_with = "null_as_empty")]
    pub image_name: String,

    /// Container name to replace
    #[serde(deserialize_with = "null_as_empty")]
    pub container_name: String,

    /// Port mapping, e.g. `8080:80`
    #[serde(deserialize_with = "null_as_empty")]
    pub port_mapping: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Error body returned on any non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
