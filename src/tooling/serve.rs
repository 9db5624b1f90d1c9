//! Line-delimited JSON request loop over a reader/writer pair.
//!
//! Each request line is `{"op": ..., "id"?: ...}`; each response line is
//! `{"id", "success", "result"}` or `{"id", "success": false, "error"}`.
//! Requests run concurrently, so responses may come back out of order and
//! are matched by `id`.

use crate::api::CoreApi;
use crate::error::ApiError;
use crate::agent::LineBuffer;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One boundary operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ServeRequest {
    ListAgents,
    AgentCommand {
        agent: String,
        command: String,
        #[serde(default)]
        args: Value,
    },
    ListTools,
    GraphTool {
        tool: String,
        #[serde(default)]
        body: Value,
    },
    Invoke {
        tool: String,
        #[serde(default)]
        args: Value,
    },
}

impl ServeRequest {
    pub async fn handle(self, api: &CoreApi) -> Result<Value, ApiError> {
        match self {
            ServeRequest::ListAgents => Ok(serde_json::to_value(api.list_agents())
                .map_err(|e| ApiError::ProtocolError(e.to_string()))?),
            ServeRequest::AgentCommand {
                agent,
                command,
                args,
            } => api.agent_command(&agent, &command, args).await,
            ServeRequest::ListTools => Ok(serde_json::to_value(api.list_tools())
                .map_err(|e| ApiError::ProtocolError(e.to_string()))?),
            ServeRequest::GraphTool { tool, body } => api.invoke_graph_tool(&tool, body),
            ServeRequest::Invoke { tool, args } => api.invoke_tool(&tool, args).await,
        }
    }
}

/// Parse one request line into its optional id and the request.
pub fn parse_request(line: &str) -> (Value, Result<ServeRequest, ApiError>) {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return (Value::Null, Err(ApiError::ProtocolError(e.to_string()))),
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request =
        serde_json::from_value(value).map_err(|e| ApiError::ProtocolError(e.to_string()));
    (id, request)
}

fn response_line(id: Value, outcome: Result<Value, ApiError>) -> String {
    let body = match outcome {
        Ok(result) => json!({ "id": id, "success": true, "result": result }),
        Err(e) => json!({ "id": id, "success": false, "error": e.to_string() }),
    };
    body.to_string()
}

/// Serve until `reader` reaches EOF and every in-flight request has answered.
pub async fn serve<R, W>(api: Arc<CoreApi>, mut reader: R, mut writer: W) -> Result<(), ApiError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let mut buffer = LineBuffer::new();
    let mut chunk = vec![0u8; 8192];
    let mut reader_open = true;
    let mut handled = 0usize;

    info!("Serving line-delimited JSON requests");
    // The loop owns `tx` until EOF so `rx` only closes once every spawned
    // request has dropped its clone.
    let mut tx = Some(tx);
    loop {
        tokio::select! {
            read = reader.read(&mut chunk), if reader_open => {
                let n = read?;
                if n == 0 {
                    reader_open = false;
                    tx = None;
                    continue;
                }
                let Some(sender) = tx.as_ref() else { continue };
                for line in buffer.push(&chunk[..n]) {
                    handled += 1;
                    let (id, request) = parse_request(&line);
                    let sender = sender.clone();
                    let api = Arc::clone(&api);
                    tokio::spawn(async move {
                        let outcome = match request {
                            Ok(request) => request.handle(&api).await,
                            Err(e) => Err(e),
                        };
                        if sender.send(response_line(id, outcome)).is_err() {
                            warn!("Response dropped, writer closed");
                        }
                    });
                }
            }
            response = rx.recv() => {
                let Some(line) = response else { break };
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
    }
    debug!(requests = handled, "Serve loop finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentGateway, AgentRuntimeInfo};
    use crate::catalog::CatalogSettings;
    use crate::graph::GraphStore;
    use async_trait::async_trait;
    use parking_lot::RwLock;

    struct NoAgents;

    #[async_trait]
    impl AgentGateway for NoAgents {
        fn list_agents(&self) -> Vec<AgentRuntimeInfo> {
            Vec::new()
        }

        async fn send_command(&self, agent: &str, _: &str, _: Value) -> Result<Value, ApiError> {
            Err(ApiError::AgentNotFound(agent.to_string()))
        }
    }

    fn api() -> Arc<CoreApi> {
        Arc::new(CoreApi::new(
            Arc::new(RwLock::new(GraphStore::new())),
            Arc::new(NoAgents),
            CatalogSettings::default(),
        ))
    }

    #[test]
    fn test_parse_request_keeps_id() {
        let (id, request) =
            parse_request(r#"{"op":"graph_tool","id":7,"tool":"read_graph","body":{"limit":5}}"#);
        assert_eq!(id, json!(7));
        assert_eq!(
            request.unwrap(),
            ServeRequest::GraphTool {
                tool: "read_graph".to_string(),
                body: json!({ "limit": 5 }),
            }
        );
    }

    #[test]
    fn test_parse_request_errors() {
        let (id, request) = parse_request("nope");
        assert_eq!(id, Value::Null);
        assert!(request.is_err());

        let (id, request) = parse_request(r#"{"op":"teleport","id":"a"}"#);
        assert_eq!(id, json!("a"));
        assert!(matches!(request, Err(ApiError::ProtocolError(_))));
    }

    #[tokio::test]
    async fn test_serve_answers_each_request() {
        let input = concat!(
            r#"{"op":"graph_tool","id":1,"tool":"create_entities","body":{"entities":[{"name":"A","entityType":"t"}]}}"#,
            "\n",
            r#"{"op":"list_tools","id":2}"#,
            "\n",
            r#"{"op":"agent_command","id":3,"agent":"Ghost","command":"ping"}"#,
            "\n",
            "garbage\n",
        );
        let mut output = Vec::new();
        serve(api(), input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 4);

        let by_id = |id: Value| responses.iter().find(|r| r["id"] == id).unwrap().clone();
        assert_eq!(by_id(json!(1))["result"]["entities_created"], 1);
        assert!(by_id(json!(2))["result"].as_array().unwrap().len() >= 9);
        let failed = by_id(json!(3));
        assert_eq!(failed["success"], false);
        assert!(failed["error"].as_str().unwrap().contains("Ghost"));
        assert_eq!(by_id(Value::Null)["success"], false);
    }
}
