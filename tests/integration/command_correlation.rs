use crate::integration::support::online_registry;
use agentgraph::agent::AgentEvent;
use agentgraph::error::ApiError;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn concurrent_commands_settle_with_their_own_results() {
    let temp = TempDir::new().unwrap();
    let registry = online_registry(temp.path(), Duration::from_secs(5)).await;

    // The slow command is answered last, after the fast ones.
    let (slow, fast_a, fast_b) = tokio::join!(
        registry.send_command("Sim", "delay", json!({ "ms": 300 })),
        registry.send_command("Sim", "echo", json!({ "tag": "a" })),
        registry.send_command("Sim", "echo", json!({ "tag": "b" })),
    );
    assert_eq!(slow.unwrap(), json!({ "delayed": 300 }));
    assert_eq!(fast_a.unwrap(), json!({ "tag": "a" }));
    assert_eq!(fast_b.unwrap(), json!({ "tag": "b" }));
    assert_eq!(registry.pending_count(), 0);
}

#[tokio::test]
async fn agent_error_becomes_command_failure() {
    let temp = TempDir::new().unwrap();
    let registry = online_registry(temp.path(), Duration::from_secs(5)).await;

    let err = registry.send_command("Sim", "fail", json!({})).await.unwrap_err();
    assert!(
        matches!(err, ApiError::CommandFailed { ref message, .. } if message == "simulated failure")
    );
}

#[tokio::test]
async fn timeout_then_late_response_is_ignored() {
    let temp = TempDir::new().unwrap();
    let registry = online_registry(temp.path(), Duration::from_millis(200)).await;

    let err = registry
        .send_command("Sim", "delay", json!({ "ms": 600 }))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::CommandTimeout { timeout_ms: 200, .. }));
    assert_eq!(registry.pending_count(), 0);

    // Let the late response arrive; the agent must stay usable.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(
        registry.send_command("Sim", "ping", json!({})).await.unwrap(),
        json!({ "pong": true })
    );
}

#[tokio::test]
async fn silent_command_times_out() {
    let temp = TempDir::new().unwrap();
    let registry = online_registry(temp.path(), Duration::from_millis(150)).await;
    assert!(matches!(
        registry.send_command("Sim", "silent", json!({})).await,
        Err(ApiError::CommandTimeout { .. })
    ));
}

#[tokio::test]
async fn noise_on_stdout_is_reported_and_survived() {
    let temp = TempDir::new().unwrap();
    let registry = online_registry(temp.path(), Duration::from_secs(5)).await;
    let mut events = registry.subscribe();

    let result = registry.send_command("Sim", "noise", json!({})).await.unwrap();
    assert_eq!(result, json!({ "noisy": true }));

    let mut saw_protocol_error = false;
    let mut saw_other_message = false;
    while let Ok(event) = events.try_recv() {
        match event {
            AgentEvent::ProtocolError { raw, .. } => {
                saw_protocol_error |= raw == "this is not json";
            }
            AgentEvent::Message { .. } => saw_other_message = true,
            _ => {}
        }
    }
    assert!(saw_protocol_error);
    assert!(saw_other_message);
}
