//! Simulator agent
//!
//! A stdio agent for manual testing and the integration suite. Sends a
//! `register` handshake, then answers host commands concurrently so that
//! responses can arrive out of order.

use agentgraph::agent::{AgentMessage, CommandResponse, Handshake, HostMessage, ToolDescriptor};
use anyhow::Context;
use clap::Parser;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::Mutex;

#[derive(Parser, Debug)]
#[command(name = "agentgraph-sim")]
#[command(about = "Line-delimited JSON simulator agent")]
struct Args {
    /// Name reported in the handshake
    #[arg(long, default_value = "Simulator")]
    name: String,

    /// Never send the handshake
    #[arg(long)]
    no_handshake: bool,

    /// Wait before sending the handshake
    #[arg(long, default_value_t = 0)]
    handshake_delay_ms: u64,
}

type SharedStdout = Arc<Mutex<Stdout>>;

fn tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "search".to_string(),
            description: "Search the simulator's fixed corpus".to_string(),
            parameters: Some(json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            })),
        },
        ToolDescriptor::new("echo", "Return the arguments unchanged"),
        ToolDescriptor::new("delay", "Answer after `ms` milliseconds"),
    ]
}

async fn write_line(stdout: &SharedStdout, line: &str) -> std::io::Result<()> {
    let mut out = stdout.lock().await;
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}

async fn respond(stdout: &SharedStdout, response: CommandResponse) -> std::io::Result<()> {
    let line = serde_json::to_string(&AgentMessage::Response(response))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    write_line(stdout, &line).await
}

/// `None` means the command gets no reply at all.
async fn answer(command: &str, args: &Value, stdout: &SharedStdout) -> Option<Result<Value, Value>> {
    match command {
        "ping" => Some(Ok(json!({ "pong": true }))),
        "echo" => Some(Ok(args.clone())),
        "getTools" => Some(Ok(json!({ "tools": tools() }))),
        "search" => {
            let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
            let corpus = ["rust ownership", "tokio runtime", "json lines"];
            let hits: Vec<&str> = corpus
                .iter()
                .copied()
                .filter(|entry| entry.contains(query))
                .collect();
            Some(Ok(json!({ "query": query, "results": hits })))
        }
        "delay" => {
            let ms = args.get("ms").and_then(Value::as_u64).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Some(Ok(json!({ "delayed": ms })))
        }
        "fail" => Some(Err(json!({ "message": "simulated failure" }))),
        "noise" => {
            let _ = write_line(stdout, "this is not json").await;
            let _ = write_line(stdout, r#"{"type":"status","state":"busy"}"#).await;
            Some(Ok(json!({ "noisy": true })))
        }
        "silent" => None,
        other => Some(Err(json!({ "message": format!("unknown command: {}", other) }))),
    }
}

async fn handle(stdout: SharedStdout, id: String, command: String, args: Value) {
    if command == "exit" {
        let code = args.get("code").and_then(Value::as_i64).unwrap_or(0);
        let _ = stdout.lock().await.flush().await;
        std::process::exit(code as i32);
    }
    let response = match answer(&command, &args, &stdout).await {
        Some(Ok(result)) => CommandResponse::success(id, result),
        Some(Err(error)) => CommandResponse {
            request_id: id,
            result: None,
            error: Some(error),
        },
        None => return,
    };
    if let Err(e) = respond(&stdout, response).await {
        eprintln!("failed to write response: {}", e);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let stdout: SharedStdout = Arc::new(Mutex::new(tokio::io::stdout()));

    if !args.no_handshake {
        if args.handshake_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(args.handshake_delay_ms)).await;
        }
        let handshake = Handshake {
            name: Some(args.name.clone()),
            capabilities: vec!["search".to_string(), "echo".to_string()],
            tools: tools(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            protocol: Some("stdio-json".to_string()),
        };
        let line = serde_json::to_string(&AgentMessage::Register(handshake))
            .context("serialize handshake")?;
        write_line(&stdout, &line).await.context("write handshake")?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<HostMessage>(line) {
            Ok(HostMessage::Command {
                id, command, args, ..
            }) => {
                tokio::spawn(handle(Arc::clone(&stdout), id, command, args));
            }
            Err(e) => eprintln!("ignoring unparseable line: {}", e),
        }
    }
    Ok(())
}
