//! HTTP request handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use openapi_server::models::{
    DeployRequest, ErrorResponse, HealthResponse, VersionResponse,
};
use tracing::{info, warn};

use crate::deploy::error::PipelineError;
use crate::models::deployment::DeploymentSpec;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Errors surfaced to HTTP callers as `{"error": <message>}`
#[derive(Debug)]
pub enum ApiError {
    /// Body is not valid JSON for a deploy request
    BadRequest(String),

    /// A pipeline stage failed
    Pipeline(PipelineError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("invalid deploy request: {}", err))
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            ApiError::BadRequest(message) => message,
            ApiError::Pipeline(err) => err.to_string(),
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "deploy-agent".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Deploy handler.
///
/// The body is parsed as JSON whatever its content type. Runs the whole
/// pipeline before responding. If the client goes away the
/// in-flight subprocess is killed along with the request future.
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: DeployRequest = serde_json::from_slice(&body)
        .inspect_err(|e| warn!("Rejected deploy request: {}", e))?;
    info!(
        "Deploy requested: {} (branch: {:?}) as image {}",
        request.repo_url, request.branch, request.image_name
    );

    let spec = DeploymentSpec::from(request);
    state.pipeline.run(&spec).await?;
    Ok(StatusCode::OK)
}
