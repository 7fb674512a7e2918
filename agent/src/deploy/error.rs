//! Deployment pipeline errors

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::deploy::command::{CommandOutput, ExitInfo, Invocation};
use crate::deploy::fsm::Stage;

/// Captured output longer than this is cut from the front when displayed
const MAX_DISPLAYED_OUTPUT: usize = 2048;

/// Error kinds, one per failure mode of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRepoAddress,
    InvalidSpec,
    WorkspaceConflict,
    FetchFailed,
    BuildFailed,
    ReplaceFailed,
    RunFailed,
}

/// A subprocess that did not exit successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub command: String,
    pub exit: ExitInfo,
    pub output: String,
}

impl CommandFailure {
    pub fn new(invocation: &Invocation, result: CommandOutput) -> Self {
        Self {
            command: invocation.command_line(),
            exit: result.exit,
            output: result.output,
        }
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` {}", self.command, self.exit)?;
        let output = self.output.trim();
        if !output.is_empty() {
            write!(f, ", output: {}", tail(output, MAX_DISPLAYED_OUTPUT))?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandFailure {}

/// Keep the last `max` bytes of `s`, on a char boundary
fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// Failure of a single pipeline stage
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("invalid repository address '{address}': {reason}")]
    InvalidRepoAddress { address: String, reason: String },

    #[error("invalid deployment: {0}")]
    InvalidSpec(String),

    #[error("workspace {} already exists", .0.display())]
    WorkspaceConflict(PathBuf),

    #[error("git clone failed: {0}")]
    FetchFailed(#[source] CommandFailure),

    #[error("image build failed: {0}")]
    BuildFailed(#[source] CommandFailure),

    #[error("failed to retire previous container: {0}")]
    ReplaceFailed(#[source] CommandFailure),

    #[error("failed to start container: {0}")]
    RunFailed(#[source] CommandFailure),
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::InvalidRepoAddress { .. } => ErrorKind::InvalidRepoAddress,
            DeployError::InvalidSpec(_) => ErrorKind::InvalidSpec,
            DeployError::WorkspaceConflict(_) => ErrorKind::WorkspaceConflict,
            DeployError::FetchFailed(_) => ErrorKind::FetchFailed,
            DeployError::BuildFailed(_) => ErrorKind::BuildFailed,
            DeployError::ReplaceFailed(_) => ErrorKind::ReplaceFailed,
            DeployError::RunFailed(_) => ErrorKind::RunFailed,
        }
    }

    /// The failed subprocess, for errors raised by one
    pub fn command_failure(&self) -> Option<&CommandFailure> {
        match self {
            DeployError::FetchFailed(failure)
            | DeployError::BuildFailed(failure)
            | DeployError::ReplaceFailed(failure)
            | DeployError::RunFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// A stage error annotated with the stage that raised it
#[derive(Error, Debug)]
#[error("{stage} stage failed: {error}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub error: DeployError,
}

impl PipelineError {
    pub fn new(stage: Stage, error: DeployError) -> Self {
        Self { stage, error }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}
