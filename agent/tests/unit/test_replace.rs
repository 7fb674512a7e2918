//! Container replacement tests

use std::sync::Arc;

use deploy_agent::deploy::docker::{ContainerEngine, EngineTimeouts};
use deploy_agent::deploy::error::ErrorKind;
use deploy_agent::deploy::replace::ContainerReplacer;

use crate::support::FakeEngine;

fn replacer(engine: &Arc<FakeEngine>) -> ContainerReplacer {
    ContainerReplacer::new(ContainerEngine::new(
        engine.clone(),
        "docker",
        EngineTimeouts::default(),
    ))
}

#[tokio::test]
async fn test_fresh_container_is_started() {
    let engine = FakeEngine::new();
    engine.add_container("other", "other", true);
    let replacer = replacer(&engine);

    // Pretend the image was built
    engine.add_container("seed", "widget", false);

    replacer
        .replace("widget-container", "widget", "8080:8080")
        .await
        .unwrap();

    assert_eq!(
        engine.commands()[engine.commands().len() - 2..],
        ["docker ps".to_string(), "docker run".to_string()]
    );
    let container = engine.container("widget-container").unwrap();
    assert!(container.running);
    assert_eq!(container.image, "widget");
    assert_eq!(container.ports, "8080:8080");

    // Unrelated containers are left alone
    assert!(engine.container("other").unwrap().running);
}

#[tokio::test]
async fn test_replace_twice_leaves_one_running_container() {
    let engine = FakeEngine::new();
    engine.add_container("seed", "widget", false);
    let replacer = replacer(&engine);

    replacer.replace("widget-container", "widget", "8080:8080").await.unwrap();
    let first = engine.container("widget-container").unwrap();

    replacer.replace("widget-container", "widget", "8080:8080").await.unwrap();
    let second = engine.container("widget-container").unwrap();

    assert_eq!(engine.running_count("widget-container"), 1);
    assert!(second.started_at > first.started_at);
}

#[tokio::test]
async fn test_stale_running_container_is_stopped_and_removed_first() {
    let engine = FakeEngine::new();
    engine.add_container("widget-container", "widget", true);
    let replacer = replacer(&engine);

    replacer.replace("widget-container", "widget", "9090:80").await.unwrap();

    assert_eq!(
        engine.commands(),
        vec!["docker ps", "docker stop", "docker rm", "docker run"]
    );
    let container = engine.container("widget-container").unwrap();
    assert!(container.started_at > engine.removed_at("widget-container").unwrap());
    assert_eq!(container.ports, "9090:80");
}

#[tokio::test]
async fn test_stopped_container_is_removed() {
    let engine = FakeEngine::new();
    engine.add_container("widget-container", "widget", false);
    let replacer = replacer(&engine);

    replacer.replace("widget-container", "widget", "8080:8080").await.unwrap();

    assert_eq!(engine.running_count("widget-container"), 1);
}

#[tokio::test]
async fn test_stop_failure_is_not_fatal() {
    let engine = FakeEngine::new();
    engine.add_container("widget-container", "widget", false);
    engine.fail("docker stop", 1);
    let replacer = replacer(&engine);

    replacer.replace("widget-container", "widget", "8080:8080").await.unwrap();

    assert_eq!(
        engine.commands(),
        vec!["docker ps", "docker stop", "docker rm", "docker run"]
    );
    assert_eq!(engine.running_count("widget-container"), 1);
}

#[tokio::test]
async fn test_remove_failure_is_fatal() {
    let engine = FakeEngine::new();
    engine.add_container("widget-container", "widget", true);
    engine.fail("docker rm", 1);
    let replacer = replacer(&engine);

    let err = replacer
        .replace("widget-container", "widget", "8080:8080")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ReplaceFailed);
    assert!(!engine.commands().contains(&"docker run".to_string()));
}

#[tokio::test]
async fn test_lookup_failure_is_fatal() {
    let engine = FakeEngine::new();
    engine.fail("docker ps", 1);
    let replacer = replacer(&engine);

    let err = replacer
        .replace("widget-container", "widget", "8080:8080")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ReplaceFailed);
    assert_eq!(engine.commands(), vec!["docker ps"]);
}

#[tokio::test]
async fn test_run_failure() {
    let engine = FakeEngine::new();
    let replacer = replacer(&engine);

    // No image named `missing` exists
    let err = replacer
        .replace("missing-container", "missing", "8080:8080")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RunFailed);
    let failure = err.command_failure().unwrap();
    assert_eq!(
        failure.command,
        "docker run --name missing-container -d -p 8080:8080 missing"
    );
    assert!(failure.output.contains("Unable to find image"));
}

#[tokio::test]
async fn test_concurrent_replacements_of_one_name() {
    let engine = FakeEngine::new();
    engine.add_container("widget-container", "widget", true);
    let replacer = replacer(&engine);

    let runs = (0..4).map(|_| replacer.replace("widget-container", "widget", "8080:8080"));
    let results = futures::future::join_all(runs).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(engine.running_count("widget-container"), 1);
}

#[tokio::test]
async fn test_engine_program_is_configurable() {
    let engine = FakeEngine::new();
    engine.add_container("seed", "widget", false);
    let replacer = ContainerReplacer::new(ContainerEngine::new(
        engine.clone(),
        "podman",
        EngineTimeouts::default(),
    ));

    replacer.replace("widget-container", "widget", "8080:8080").await.unwrap();

    assert!(engine.invocations().iter().all(|i| i.program == "podman"));
}
