//! Container engine command line client
//!
//! Works with any docker-compatible CLI (`docker`, `podman`). Only exit status
//! and captured output are interpreted.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::deploy::command::{CommandRunner, Invocation};
use crate::deploy::error::CommandFailure;

/// Deadlines for engine operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTimeouts {
    /// `build`
    pub build: Duration,

    /// `ps`, `stop`, `rm` and `run`
    pub container: Duration,
}

impl Default for EngineTimeouts {
    fn default() -> Self {
        Self {
            build: Duration::from_secs(1800),
            container: Duration::from_secs(120),
        }
    }
}

/// Thin wrapper over the engine CLI
#[derive(Clone)]
pub struct ContainerEngine {
    runner: Arc<dyn CommandRunner>,
    program: String,
    timeouts: EngineTimeouts,
}

impl ContainerEngine {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        program: impl Into<String>,
        timeouts: EngineTimeouts,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            timeouts,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `build -t <image> .` with `context` as the child's working directory
    pub async fn build(&self, image: &str, context: &Path) -> Result<String, CommandFailure> {
        let invocation = self
            .invocation(["build", "-t", image, "."])
            .current_dir(context)
            .timeout(self.timeouts.build);
        self.execute(invocation).await
    }

    /// Whether a container with exactly this name exists, running or stopped
    pub async fn container_exists(&self, name: &str) -> Result<bool, CommandFailure> {
        let filter = format!("name=^{}$", name);
        let invocation = self
            .invocation(["ps", "-a", "--filter", &filter, "--format", "{{.Names}}"])
            .timeout(self.timeouts.container);
        let output = self.execute(invocation).await?;

        // The name filter is a pattern match; require an exact line
        Ok(output
            .lines()
            .map(|line| line.trim().trim_start_matches('/'))
            .any(|line| line == name))
    }

    pub async fn stop(&self, name: &str) -> Result<String, CommandFailure> {
        let invocation = self
            .invocation(["stop", name])
            .timeout(self.timeouts.container);
        self.execute(invocation).await
    }

    pub async fn remove(&self, name: &str) -> Result<String, CommandFailure> {
        let invocation = self.invocation(["rm", name]).timeout(self.timeouts.container);
        self.execute(invocation).await
    }

    /// `run --name <name> -d -p <ports> <image>`
    pub async fn run_detached(
        &self,
        name: &str,
        image: &str,
        port_mapping: &str,
    ) -> Result<String, CommandFailure> {
        let invocation = self
            .invocation(["run", "--name", name, "-d", "-p", port_mapping, image])
            .timeout(self.timeouts.container);
        self.execute(invocation).await
    }

    fn invocation<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Invocation {
        Invocation::new(self.program.as_str(), args)
    }

    async fn execute(&self, invocation: Invocation) -> Result<String, CommandFailure> {
        let result = self.runner.run(&invocation).await;
        if result.success() {
            Ok(result.output)
        } else {
            Err(CommandFailure::new(&invocation, result))
        }
    }
}
