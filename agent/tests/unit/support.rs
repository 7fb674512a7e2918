//! Scripted stand-in for git and the container engine

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deploy_agent::deploy::command::{CommandOutput, CommandRunner, ExitInfo, Invocation};
use deploy_agent::deploy::pipeline::{DeploymentPipeline, PipelineSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeContainer {
    pub image: String,
    pub ports: String,
    pub running: bool,
    /// Tick of the invocation that started it
    pub started_at: u64,
}

#[derive(Debug, Default)]
struct EngineState {
    clock: u64,
    invocations: Vec<Invocation>,
    containers: BTreeMap<String, FakeContainer>,
    images: HashSet<String>,
    /// Tick at which each container name was last removed
    removed_at: HashMap<String, u64>,
    /// `"<program> <subcommand>"` -> exit code to fail with
    failures: HashMap<String, i32>,
}

/// Simulates `git clone` on the real filesystem and keeps an in-memory
/// model of images and containers for the engine subcommands.
#[derive(Debug, Default)]
pub struct FakeEngine {
    state: Mutex<EngineState>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every `<program> <subcommand>` invocation exit with `code`
    pub fn fail(&self, command: &str, code: i32) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(command.to_string(), code);
    }

    pub fn heal(&self, command: &str) {
        self.state.lock().unwrap().failures.remove(command);
    }

    pub fn add_container(&self, name: &str, image: &str, running: bool) {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let started_at = state.clock;
        state.images.insert(image.to_string());
        state.containers.insert(
            name.to_string(),
            FakeContainer {
                image: image.to_string(),
                ports: "8080:8080".to_string(),
                running,
                started_at,
            },
        );
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.state.lock().unwrap().containers.get(name).cloned()
    }

    pub fn removed_at(&self, name: &str) -> Option<u64> {
        self.state.lock().unwrap().removed_at.get(name).copied()
    }

    /// Containers currently running under `name`
    pub fn running_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .containers
            .iter()
            .filter(|(n, c)| n.as_str() == name && c.running)
            .count()
    }

    pub fn has_image(&self, image: &str) -> bool {
        self.state.lock().unwrap().images.contains(image)
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.state.lock().unwrap().invocations.clone()
    }

    /// `"<program> <subcommand>"` of every invocation, in order
    pub fn commands(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(|i| format!("{} {}", i.program, i.args.first().cloned().unwrap_or_default()))
            .collect()
    }

    fn ok(output: impl Into<String>) -> CommandOutput {
        CommandOutput::new(ExitInfo::Code(0), output)
    }

    fn err(code: i32, output: impl Into<String>) -> CommandOutput {
        CommandOutput::new(ExitInfo::Code(code), output)
    }

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }
}

#[async_trait]
impl CommandRunner for FakeEngine {
    async fn run(&self, invocation: &Invocation) -> CommandOutput {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.clock += 1;
        let now = state.clock;
        state.invocations.push(invocation.clone());

        let args = &invocation.args;
        let subcommand = args.first().map(String::as_str).unwrap_or_default();
        let key = format!("{} {}", invocation.program, subcommand);
        if let Some(code) = state.failures.get(&key) {
            return Self::err(*code, format!("simulated failure of {}", key));
        }

        match subcommand {
            "clone" => {
                let Some(target) = args.last() else {
                    return Self::err(129, "usage: git clone");
                };
                if Path::new(target).exists() {
                    return Self::err(128, format!("destination path '{}' already exists", target));
                }
                std::fs::create_dir_all(target).unwrap();
                std::fs::write(Path::new(target).join("Dockerfile"), "FROM scratch\n").unwrap();
                Self::ok(format!("Cloning into '{}'...\n", target))
            }
            "build" => {
                let context_ok = invocation
                    .current_dir
                    .as_ref()
                    .is_some_and(|dir| dir.join("Dockerfile").exists());
                if !context_ok {
                    return Self::err(1, "unable to prepare context: Dockerfile not found");
                }
                let Some(image) = Self::arg_after(args, "-t") else {
                    return Self::err(1, "missing tag");
                };
                state.images.insert(image.to_string());
                Self::ok(format!("Successfully tagged {}:latest\n", image))
            }
            "ps" => {
                let filter = Self::arg_after(args, "--filter").unwrap_or_default();
                let name = filter
                    .trim_start_matches("name=^")
                    .trim_end_matches('$')
                    .to_string();
                let names: Vec<&String> = state.containers.keys().filter(|n| **n == name).collect();
                Self::ok(
                    names
                        .iter()
                        .map(|n| format!("{}\n", n))
                        .collect::<String>(),
                )
            }
            "stop" => match state.containers.get_mut(&args[1]) {
                Some(container) => {
                    container.running = false;
                    Self::ok(format!("{}\n", args[1]))
                }
                None => Self::err(1, format!("No such container: {}", args[1])),
            },
            "rm" => match state.containers.get(&args[1]).map(|c| c.running) {
                Some(true) => Self::err(
                    1,
                    "cannot remove a running container, stop the container before attempting removal",
                ),
                Some(false) => {
                    let name = args[1].clone();
                    state.containers.remove(&name);
                    state.removed_at.insert(name.clone(), now);
                    Self::ok(format!("{}\n", name))
                }
                None => Self::err(1, format!("No such container: {}", args[1])),
            },
            "run" => {
                let name = Self::arg_after(args, "--name").unwrap_or_default().to_string();
                let ports = Self::arg_after(args, "-p").unwrap_or_default().to_string();
                let image = args.last().cloned().unwrap_or_default();
                if state.containers.contains_key(&name) {
                    return Self::err(125, format!("Conflict. The container name \"/{}\" is already in use", name));
                }
                if !state.images.contains(&image) {
                    return Self::err(125, format!("Unable to find image '{}:latest' locally", image));
                }
                state.containers.insert(
                    name,
                    FakeContainer {
                        image,
                        ports,
                        running: true,
                        started_at: now,
                    },
                );
                Self::ok("0123456789abcdef\n")
            }
            other => Self::err(127, format!("unknown command {}", other)),
        }
    }
}

/// Settings rooted in `workspace_root` with the default program names
pub fn settings(workspace_root: &Path) -> PipelineSettings {
    PipelineSettings {
        workspace_root: workspace_root.to_path_buf(),
        ..Default::default()
    }
}

pub fn pipeline(workspace_root: &Path, engine: &Arc<FakeEngine>) -> DeploymentPipeline {
    DeploymentPipeline::with_runner(&settings(workspace_root), engine.clone())
}
