use agentgraph::config::AgentGraphConfig;
use agentgraph::tooling::cli::{CliContext, Commands};
use serde_json::{json, Value};
use tempfile::TempDir;

fn context(temp: &TempDir) -> CliContext {
    let mut config = AgentGraphConfig::default();
    config.storage.snapshot_path = Some("state/graph.json".into());
    CliContext::from_config(temp.path().to_path_buf(), config).unwrap()
}

async fn graph(ctx: &CliContext, tool: &str, body: Value) -> Value {
    let output = ctx
        .execute(&Commands::Graph {
            tool: tool.to_string(),
            body: Some(body.to_string()),
            format: "json".to_string(),
        })
        .await
        .unwrap();
    serde_json::from_str(&output).unwrap()
}

#[tokio::test]
async fn graph_survives_restart_through_snapshot() {
    let temp = TempDir::new().unwrap();
    {
        let ctx = context(&temp);
        graph(
            &ctx,
            "create_entities",
            json!({ "entities": [{ "name": "Note1", "entityType": "note", "observations": ["first"] }] }),
        )
        .await;
        graph(
            &ctx,
            "add_observations",
            json!({ "observations": [{ "entityName": "Note1", "contents": ["second"] }] }),
        )
        .await;
    }
    assert!(temp.path().join("state/graph.json").exists());

    let ctx = context(&temp);
    let page = graph(&ctx, "read_graph", json!({})).await;
    assert_eq!(page["graph"]["entities"][0]["name"], "Note1");

    // The entity's copy and the standalone observation both match.
    let found = graph(&ctx, "query_graph", json!({ "query": "second" })).await;
    assert_eq!(found["total_found"], 2);
    assert_eq!(found["results"][0]["resultType"], "entity");
    assert_eq!(found["results"][1]["resultType"], "observation");
}

#[tokio::test]
async fn clear_is_persisted() {
    let temp = TempDir::new().unwrap();
    {
        let ctx = context(&temp);
        graph(&ctx, "create_entities", json!({ "entities": [{ "name": "A" }] })).await;
        graph(&ctx, "clear", json!({})).await;
    }
    let ctx = context(&temp);
    let stats = graph(&ctx, "stats", json!({})).await;
    assert_eq!(stats["entities"], 0);
}

#[tokio::test]
async fn corrupt_snapshot_starts_empty() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("state")).unwrap();
    std::fs::write(temp.path().join("state/graph.json"), "{not json").unwrap();

    let ctx = context(&temp);
    let stats = graph(&ctx, "stats", json!({})).await;
    assert_eq!(stats["entities"], 0);
}
