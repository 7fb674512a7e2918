//! Deployment pipeline: locate, allocate workspace, clone, build, replace

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::deploy::command::{CommandRunner, ProcessRunner};
use crate::deploy::docker::{ContainerEngine, EngineTimeouts};
use crate::deploy::error::PipelineError;
use crate::deploy::fsm::{DeploymentEvent, PipelineState, Stage};
use crate::deploy::git::SourceFetcher;
use crate::deploy::image::ImageBuilder;
use crate::deploy::locator::{RepoLocator, DEFAULT_KNOWN_HOSTS};
use crate::deploy::replace::ContainerReplacer;
use crate::deploy::workspace::WorkspaceManager;
use crate::models::deployment::{DeploymentReport, DeploymentSpec, DEFAULT_PORT_MAPPING};

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory that derived and relative workspace paths are placed under
    pub workspace_root: PathBuf,

    /// Port mapping for requests that carry none
    pub default_port_mapping: String,

    /// Hosts accepted in repository addresses
    pub known_hosts: Vec<String>,

    /// git executable
    pub git_program: String,

    /// docker-compatible engine executable
    pub engine_program: String,

    /// Deadline for `git clone`
    pub clone_timeout: Duration,

    /// Deadline for image builds
    pub build_timeout: Duration,

    /// Deadline for each container operation
    pub container_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let engine_timeouts = EngineTimeouts::default();
        Self {
            workspace_root: PathBuf::from("."),
            default_port_mapping: DEFAULT_PORT_MAPPING.to_string(),
            known_hosts: DEFAULT_KNOWN_HOSTS.iter().map(|h| h.to_string()).collect(),
            git_program: "git".to_string(),
            engine_program: "docker".to_string(),
            clone_timeout: Duration::from_secs(600),
            build_timeout: engine_timeouts.build,
            container_timeout: engine_timeouts.container,
        }
    }
}

/// Runs deployments end to end.
///
/// Safe to share between concurrent runs: each run owns its own
/// [`PipelineState`], workspaces are reserved per path and container
/// replacement is serialized per container name.
pub struct DeploymentPipeline {
    locator: RepoLocator,
    workspaces: WorkspaceManager,
    fetcher: SourceFetcher,
    builder: ImageBuilder,
    replacer: ContainerReplacer,
    default_port_mapping: String,
}

impl DeploymentPipeline {
    /// Create a pipeline that runs real subprocesses
    pub fn new(settings: &PipelineSettings) -> Self {
        Self::with_runner(settings, Arc::new(ProcessRunner))
    }

    /// Create a pipeline on top of a custom command runner
    pub fn with_runner(settings: &PipelineSettings, runner: Arc<dyn CommandRunner>) -> Self {
        let engine = ContainerEngine::new(
            runner.clone(),
            settings.engine_program.as_str(),
            EngineTimeouts {
                build: settings.build_timeout,
                container: settings.container_timeout,
            },
        );

        Self {
            locator: RepoLocator::new(settings.known_hosts.iter().cloned()),
            workspaces: WorkspaceManager::new(settings.workspace_root.clone()),
            fetcher: SourceFetcher::new(
                runner,
                settings.git_program.as_str(),
                settings.clone_timeout,
            ),
            builder: ImageBuilder::new(engine.clone()),
            replacer: ContainerReplacer::new(engine),
            default_port_mapping: settings.default_port_mapping.clone(),
        }
    }

    /// Run one deployment.
    ///
    /// Stops at the first failing stage. Nothing is retried or rolled back:
    /// a cloned workspace or built image from a failed run is left in place,
    /// and a previously deployed container keeps running if the build fails.
    pub async fn run(&self, spec: &DeploymentSpec) -> Result<DeploymentReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "deploy",
            run_id = %run_id,
            repo = %spec.repo_address,
            image = %spec.image_name,
        );

        async move {
            let mut state = PipelineState::new();
            let result = self.execute(run_id, spec, &mut state).await;
            match &result {
                Ok(report) => info!(
                    "Deployment succeeded: container {} running image {}",
                    report.container_name, report.image_name
                ),
                Err(e) => {
                    transition(&mut state, DeploymentEvent::Failed(e.to_string()));
                    error!("Deployment failed: {}", e);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        spec: &DeploymentSpec,
        state: &mut PipelineState,
    ) -> Result<DeploymentReport, PipelineError> {
        let started_at = Utc::now();
        let branch = spec.branch();

        let coords = self
            .locator
            .locate(&spec.repo_address)
            .map_err(|e| PipelineError::new(Stage::Locate, e))?;
        info!("Located repository {}/{}", coords.owner, coords.name);

        // Reject an unusable image name before anything is cloned
        ImageBuilder::check_image_name(&spec.image_name)
            .map_err(|e| PipelineError::new(Stage::Build, e))?;

        let workspace = self
            .workspaces
            .allocate(&coords, branch, spec.work_dir())
            .await
            .map_err(|e| PipelineError::new(Stage::Workspace, e))?;
        state.set_work_dir(workspace.path());
        info!("Workspace resolved to {}", workspace.path().display());

        self.fetcher
            .clone_branch(&spec.repo_address, branch, workspace.path())
            .await
            .map_err(|e| PipelineError::new(Stage::Fetch, e))?;
        transition(state, DeploymentEvent::Cloned);

        self.builder
            .build(&spec.image_name, workspace.path())
            .await
            .map_err(|e| PipelineError::new(Stage::Build, e))?;
        transition(state, DeploymentEvent::ImageBuilt);

        let container_name = spec.container_name();
        let port_mapping = spec.port_mapping(&self.default_port_mapping).to_string();
        state.set_container_name(container_name.as_str());
        self.replacer
            .replace(&container_name, &spec.image_name, &port_mapping)
            .await
            .map_err(|e| PipelineError::new(Stage::Replace, e))?;
        transition(state, DeploymentEvent::ContainerStarted);

        Ok(DeploymentReport {
            run_id,
            work_dir: workspace.path().to_path_buf(),
            image_name: spec.image_name.clone(),
            container_name,
            port_mapping,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

fn transition(state: &mut PipelineState, event: DeploymentEvent) {
    match state.process(event) {
        Ok(()) => info!("Pipeline state: {:?}", state.state()),
        Err(e) => warn!("{}", e),
    }
}

