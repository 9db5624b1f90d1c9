use crate::integration::support::{
    online_registry, sim_definition, wait_for_status, write_registry, HANDSHAKE_WAIT,
};
use agentgraph::agent::{AgentDefinition, AgentRegistry, AgentStatus};
use agentgraph::error::ApiError;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn auto_start_agent_comes_online_with_its_tools() {
    let temp = TempDir::new().unwrap();
    let registry = online_registry(temp.path(), Duration::from_secs(5)).await;

    let agents = registry.list_agents();
    assert_eq!(agents.len(), 1);
    let sim = &agents[0];
    assert_eq!(sim.name, "Sim");
    assert_eq!(sim.display_name, "Simulator");
    assert_eq!(sim.status, AgentStatus::Online);
    assert_eq!(sim.protocol, "stdio-json");
    assert!(sim.pid.is_some());
    assert_eq!(sim.description.as_deref(), Some("Simulator agent"));
    let tools: Vec<&str> = sim.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tools, vec!["search", "echo", "delay"]);
}

#[tokio::test]
async fn manual_agents_wait_for_start() {
    let temp = TempDir::new().unwrap();
    let path = write_registry(
        temp.path(),
        json!({ "Manual": sim_definition(&["--name", "Manual Sim"], false) }),
    );
    let registry = AgentRegistry::new(path, Duration::from_secs(5));
    assert!(registry.init().is_empty());
    assert!(registry.list_agents().is_empty());
    assert!(matches!(
        registry.send_command("Manual", "ping", json!({})).await,
        Err(ApiError::AgentNotFound(_))
    ));

    registry.start_agent("Manual").unwrap();
    let info = registry.wait_for_agent("Manual", HANDSHAKE_WAIT).await.unwrap();
    assert_eq!(info.display_name, "Manual Sim");
    let pong = registry.send_command("Manual", "ping", json!({})).await.unwrap();
    assert_eq!(pong, json!({ "pong": true }));
}

#[tokio::test]
async fn exited_agent_rejects_commands_until_restarted() {
    let temp = TempDir::new().unwrap();
    let registry = online_registry(temp.path(), Duration::from_millis(300)).await;
    let first_pid = registry.get_agent("Sim").unwrap().pid;

    // The agent exits instead of answering.
    let exit = registry.send_command("Sim", "exit", json!({ "code": 3 })).await;
    assert!(matches!(exit, Err(ApiError::CommandTimeout { .. })));
    wait_for_status(&registry, "Sim", AgentStatus::Exited).await;

    let err = registry.send_command("Sim", "ping", json!({})).await.unwrap_err();
    assert!(matches!(err, ApiError::AgentOffline { ref status, .. } if status == "exited"));
    assert_eq!(registry.pending_count(), 0);

    registry.start_agent("Sim").unwrap();
    let info = registry.wait_for_agent("Sim", HANDSHAKE_WAIT).await.unwrap();
    assert_ne!(info.pid, first_pid);
    assert!(registry.send_command("Sim", "ping", json!({})).await.is_ok());
}

#[tokio::test]
async fn stopped_agent_is_no_longer_routable() {
    let temp = TempDir::new().unwrap();
    let registry = online_registry(temp.path(), Duration::from_secs(5)).await;

    registry.stop_agent("Sim").unwrap();
    wait_for_status(&registry, "Sim", AgentStatus::Exited).await;
    assert!(matches!(
        registry.send_command("Sim", "ping", json!({})).await,
        Err(ApiError::AgentNotFound(_))
    ));
}

#[tokio::test]
async fn agent_without_handshake_never_lists() {
    let temp = TempDir::new().unwrap();
    let path = write_registry(
        temp.path(),
        json!({ "Mute": sim_definition(&["--no-handshake"], true) }),
    );
    let registry = AgentRegistry::new(path, Duration::from_secs(5));
    assert_eq!(registry.init(), vec!["Mute".to_string()]);

    let err = registry
        .wait_for_agent("Mute", Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::AgentNotFound(_)));
    assert!(registry.list_agents().is_empty());
}

#[tokio::test]
async fn spawn_failure_is_reported_and_others_still_start() {
    let temp = TempDir::new().unwrap();
    let path = write_registry(
        temp.path(),
        json!({
            "Broken": { "command": "/definitely/not/a/real/binary", "autoStart": true },
            "Sim": sim_definition(&[], true)
        }),
    );
    let registry = AgentRegistry::new(path, Duration::from_secs(5));
    assert_eq!(registry.init(), vec!["Sim".to_string()]);
    registry.wait_for_agent("Sim", HANDSHAKE_WAIT).await.unwrap();

    let err = registry.start_agent("Broken").unwrap_err();
    assert!(matches!(err, ApiError::AgentSpawnFailed { .. }));
}

#[tokio::test]
async fn defined_agent_can_start_without_registry_file() {
    let temp = TempDir::new().unwrap();
    let registry = AgentRegistry::new(temp.path().join("missing.json"), Duration::from_secs(5));
    assert_eq!(registry.load_registry(), 0);

    registry.define_agent(
        AgentDefinition::new("Inline", crate::integration::support::SIM)
            .with_args(["--handshake-delay-ms", "50"]),
    );
    registry.start_agent("Inline").unwrap();
    registry.wait_for_agent("Inline", HANDSHAKE_WAIT).await.unwrap();
    assert_eq!(registry.list_agents()[0].name, "Inline");
}
