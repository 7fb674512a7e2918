//! Git source fetching

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::deploy::command::{CommandRunner, Invocation};
use crate::deploy::error::{CommandFailure, DeployError};

/// Clones repositories with the git command line client
#[derive(Clone)]
pub struct SourceFetcher {
    runner: Arc<dyn CommandRunner>,
    program: String,
    timeout: Duration,
}

impl SourceFetcher {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            program: program.into(),
            timeout,
        }
    }

    /// Clone `branch` of `repo_url` into `target_dir`, which must not exist yet
    pub async fn clone_branch(
        &self,
        repo_url: &str,
        branch: &str,
        target_dir: &Path,
    ) -> Result<(), DeployError> {
        info!(
            "Cloning {} (branch: {}) into {}",
            repo_url,
            branch,
            target_dir.display()
        );

        let target = target_dir.to_string_lossy();
        let invocation = Invocation::new(
            self.program.as_str(),
            ["clone", "--branch", branch, repo_url, &*target],
        )
        .timeout(self.timeout);

        let result = self.runner.run(&invocation).await;
        if !result.success() {
            return Err(DeployError::FetchFailed(CommandFailure::new(&invocation, result)));
        }

        debug!("git clone output: {}", result.output.trim());
        Ok(())
    }
}
