use crate::integration::support::online_registry;
use agentgraph::agent::AgentGateway;
use agentgraph::api::CoreApi;
use agentgraph::catalog::{BuiltinTool, CatalogSettings, ToolSource};
use agentgraph::error::ApiError;
use agentgraph::graph::GraphStore;
use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn api_with_sim(temp: &TempDir) -> (CoreApi, Arc<agentgraph::agent::AgentRegistry>) {
    let registry = Arc::new(online_registry(temp.path(), Duration::from_secs(5)).await);
    let gateway: Arc<dyn AgentGateway> = registry.clone();
    let api = CoreApi::new(
        Arc::new(RwLock::new(GraphStore::new())),
        gateway,
        CatalogSettings::default(),
    );
    (api, registry)
}

#[tokio::test]
async fn catalog_merges_agent_tools_ahead_of_builtins() {
    let temp = TempDir::new().unwrap();
    let (api, _registry) = api_with_sim(&temp).await;

    let catalog = api.list_tools();
    assert_eq!(catalog.len(), BuiltinTool::ALL.len() + 3);
    assert_eq!(
        &catalog.names()[..3],
        &["agent_Sim_search", "agent_Sim_echo", "agent_Sim_delay"]
    );
    let search = catalog.get("agent_Sim_search").unwrap();
    assert_eq!(search.source, ToolSource::Agent);
    assert_eq!(search.agent.as_deref(), Some("Sim"));
    assert_eq!(search.parameters["required"], json!(["query"]));
    assert!(catalog.get("query_graph").is_some());
}

#[tokio::test]
async fn agent_tool_invocation_reaches_the_process() {
    let temp = TempDir::new().unwrap();
    let (api, _registry) = api_with_sim(&temp).await;

    let result = api
        .invoke_tool("agent_Sim_search", json!({ "query": "tokio" }))
        .await
        .unwrap();
    assert_eq!(result["results"], json!(["tokio runtime"]));

    let legacy = api
        .invoke_tool(
            "agent_command",
            json!({ "agentId": "Sim", "command": "echo", "args": { "x": 1 } }),
        )
        .await
        .unwrap();
    assert_eq!(legacy, json!({ "x": 1 }));
}

#[tokio::test]
async fn stopped_agent_tools_leave_the_catalog() {
    let temp = TempDir::new().unwrap();
    let (api, registry) = api_with_sim(&temp).await;

    registry.stop_agent("Sim").unwrap();
    crate::integration::support::wait_for_status(
        &registry,
        "Sim",
        agentgraph::agent::AgentStatus::Exited,
    )
    .await;

    assert_eq!(api.list_tools().len(), BuiltinTool::ALL.len());
    assert!(matches!(
        api.invoke_tool("agent_Sim_search", json!({ "query": "x" })).await,
        Err(ApiError::UnknownTool(_))
    ));
}

#[tokio::test]
async fn graph_tools_work_alongside_agents() {
    let temp = TempDir::new().unwrap();
    let (api, _registry) = api_with_sim(&temp).await;

    api.invoke_tool(
        "create_entities",
        json!({ "entities": [
            { "name": "Rust", "entityType": "language" },
            { "name": "Tokio", "entityType": "library" }
        ]}),
    )
    .await
    .unwrap();
    api.invoke_tool(
        "create_relations",
        json!({ "relations": [{ "from": "Tokio", "to": "Rust", "relationType": "written_in" }] }),
    )
    .await
    .unwrap();

    let found = api
        .invoke_tool("query_graph", json!({ "query": "tokio" }))
        .await
        .unwrap();
    assert_eq!(found["total_found"], 1);
    assert_eq!(api.statistics().relations, 1);
}
