use agentgraph::agent::{AgentRegistry, AgentStatus};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SIM: &str = env!("CARGO_BIN_EXE_agentgraph-sim");

/// Generous bound for process startup on a loaded CI machine.
pub const HANDSHAKE_WAIT: Duration = Duration::from_secs(10);

pub fn sim_definition(args: &[&str], auto_start: bool) -> Value {
    json!({
        "command": SIM,
        "args": args,
        "autoStart": auto_start,
        "description": "Simulator agent"
    })
}

pub fn write_registry(dir: &Path, agents: Value) -> PathBuf {
    let path = dir.join("agent-registry.json");
    std::fs::write(&path, json!({ "agents": agents }).to_string()).unwrap();
    path
}

/// Registry with one auto-started simulator named `Sim`, already online.
pub async fn online_registry(dir: &Path, command_timeout: Duration) -> AgentRegistry {
    let path = write_registry(dir, json!({ "Sim": sim_definition(&[], true) }));
    let registry = AgentRegistry::new(path, command_timeout);
    assert_eq!(registry.init(), vec!["Sim".to_string()]);
    registry.wait_for_agent("Sim", HANDSHAKE_WAIT).await.unwrap();
    registry
}

pub async fn wait_for_status(registry: &AgentRegistry, name: &str, status: AgentStatus) {
    let deadline = tokio::time::Instant::now() + HANDSHAKE_WAIT;
    loop {
        if registry.get_agent(name).map(|a| a.status) == Some(status) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "{} never reached {}",
            name,
            status
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
