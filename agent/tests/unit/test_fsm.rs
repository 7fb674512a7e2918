//! FSM unit tests

use deploy_agent::deploy::fsm::{DeploymentEvent, DeploymentState, PipelineState};

#[test]
fn test_fsm_initial_state() {
    let state = PipelineState::new();
    assert_eq!(state.state(), DeploymentState::NotStarted);
    assert!(state.error().is_none());
    assert!(state.work_dir().is_none());
    assert!(state.container_name().is_none());
    assert!(!state.is_terminal());
}

#[test]
fn test_fsm_deploy_success_flow() {
    let mut state = PipelineState::new();

    // NotStarted -> Cloned
    state.process(DeploymentEvent::Cloned).unwrap();
    assert_eq!(state.state(), DeploymentState::Cloned);

    // Cloned -> ImageBuilt
    state.process(DeploymentEvent::ImageBuilt).unwrap();
    assert_eq!(state.state(), DeploymentState::ImageBuilt);

    // ImageBuilt -> ContainerRunning
    state.process(DeploymentEvent::ContainerStarted).unwrap();
    assert_eq!(state.state(), DeploymentState::ContainerRunning);
}

#[test]
fn test_fsm_failure_before_clone() {
    let mut state = PipelineState::new();

    state
        .process(DeploymentEvent::Failed("workspace exists".to_string()))
        .unwrap();

    assert_eq!(state.state(), DeploymentState::Failed);
    assert_eq!(state.error(), Some("workspace exists"));
    assert!(state.is_terminal());
}

#[test]
fn test_fsm_no_transition_after_success() {
    let mut state = PipelineState::new();
    state.process(DeploymentEvent::Cloned).unwrap();
    state.process(DeploymentEvent::ImageBuilt).unwrap();
    state.process(DeploymentEvent::ContainerStarted).unwrap();

    let result = state.process(DeploymentEvent::Failed("late".to_string()));
    assert!(result.is_err());
    assert_eq!(state.state(), DeploymentState::ContainerRunning);
}

#[test]
fn test_fsm_records_resolved_names() {
    let mut state = PipelineState::new();
    state.set_work_dir("widget");
    state.set_container_name("widget-container");

    assert_eq!(state.work_dir(), Some(std::path::Path::new("widget")));
    assert_eq!(state.container_name(), Some("widget-container"));
}
