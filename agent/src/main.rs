//! Deploy Agent - Entry Point
//!
//! Serves `POST /app/v1/deploy`, or with `--deploy` runs one deployment from
//! command line values and exits.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use deploy_agent::app::run::{deploy_once, run};
use deploy_agent::logs::init_logging;
use deploy_agent::models::deployment::DeploymentSpec;
use deploy_agent::storage::settings::Settings;
use deploy_agent::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return ExitCode::SUCCESS;
    }

    // Retrieve the settings file
    let settings = match cli_args.get("settings") {
        Some(path) => match Settings::load(path).await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };

    // Initialize logging
    let _log_guard = match init_logging(settings.log_options()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = settings.app_options();

    // Run a single deployment
    if cli_args.contains_key("deploy") {
        let spec = spec_from_args(&cli_args);
        return match deploy_once(&options, &spec).await {
            Ok(report) => {
                info!(
                    "Deployed {} as container {} ({})",
                    report.image_name, report.container_name, report.port_mapping
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Deployment failed: {e}");
                eprintln!("Deployment failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    // Run the server
    info!("Running deploy agent with options: {:?}", options);
    if let Err(e) = run(version.version, options, await_shutdown_signal()).await {
        error!("Failed to run the agent: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Build a deployment from `--repo_url=... --image_name=...` style flags
fn spec_from_args(cli_args: &HashMap<String, String>) -> DeploymentSpec {
    let get = |key: &str| cli_args.get(key).cloned().unwrap_or_default();
    DeploymentSpec::new(get("repo_url"), get("image_name"))
        .with_branch(get("branch"))
        .with_work_dir(get("local_dir"))
        .with_container_name(get("container_name"))
        .with_port_mapping(get("port_mapping"))
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    error!("Failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
