//! Child process supervision for one agent.
//!
//! Each spawned agent gets three tasks: a stdout reader that splits the byte
//! stream into protocol lines, a stderr forwarder, and a supervisor that
//! waits for exit (or a kill request) and reports it once stdout is drained.

use super::definition::AgentDefinition;
use super::protocol::{parse_line, AgentMessage, CommandResponse, Handshake, Inbound};
use crate::error::ApiError;
use serde_json::Value;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};

/// Something observed on an agent's pipes or lifecycle.
///
/// `instance` identifies the spawn the event came from, so events of a
/// replaced process can be told apart from its successor's.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Registered {
        agent: String,
        instance: u64,
        handshake: Handshake,
        pid: Option<u32>,
    },
    Response {
        agent: String,
        instance: u64,
        response: CommandResponse,
    },
    Message {
        agent: String,
        instance: u64,
        message: Value,
    },
    ProtocolError {
        agent: String,
        instance: u64,
        error: String,
        raw: String,
    },
    Stderr {
        agent: String,
        instance: u64,
        data: String,
    },
    Exited {
        agent: String,
        instance: u64,
        code: Option<i32>,
    },
}

impl AgentEvent {
    pub fn agent(&self) -> &str {
        match self {
            AgentEvent::Registered { agent, .. }
            | AgentEvent::Response { agent, .. }
            | AgentEvent::Message { agent, .. }
            | AgentEvent::ProtocolError { agent, .. }
            | AgentEvent::Stderr { agent, .. }
            | AgentEvent::Exited { agent, .. } => agent,
        }
    }

    pub fn instance(&self) -> u64 {
        match self {
            AgentEvent::Registered { instance, .. }
            | AgentEvent::Response { instance, .. }
            | AgentEvent::Message { instance, .. }
            | AgentEvent::ProtocolError { instance, .. }
            | AgentEvent::Stderr { instance, .. }
            | AgentEvent::Exited { instance, .. } => *instance,
        }
    }
}

/// Splits an arbitrarily chunked byte stream into complete lines.
///
/// A trailing fragment without a newline is held until the next chunk.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, trimmed, with
    /// blank lines dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        lines
    }

    /// Bytes held back waiting for a newline.
    pub fn remainder(&self) -> &[u8] {
        &self.pending
    }
}

/// Handle to a running agent child process.
///
/// Dropping the handle kills the child.
pub struct AgentProcess {
    name: String,
    instance: u64,
    pid: Option<u32>,
    stdin: Mutex<Option<ChildStdin>>,
    kill_tx: parking_lot::Mutex<Option<oneshot::Sender<()>>>,
}

impl AgentProcess {
    /// Spawn the child described by `definition` and start its pipe tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        definition: &AgentDefinition,
        instance: u64,
        events: mpsc::UnboundedSender<AgentEvent>,
    ) -> Result<Self, ApiError> {
        let name = definition.name.clone();
        let mut command = Command::new(&definition.command);
        command
            .args(&definition.args)
            .envs(&definition.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &definition.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| ApiError::AgentSpawnFailed {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        let pid = child.id();

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or_else(|| ApiError::AgentSpawnFailed {
            name: name.clone(),
            reason: "stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take();

        let reader = tokio::spawn(read_stdout(
            name.clone(),
            instance,
            pid,
            stdout,
            events.clone(),
        ));
        if let Some(stderr) = stderr {
            tokio::spawn(forward_stderr(name.clone(), instance, stderr, events.clone()));
        }

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let supervised = name.clone();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx => {
                    if let Err(e) = child.start_kill() {
                        debug!(agent = %supervised, error = %e, "Kill signal failed");
                    }
                    child.wait().await
                }
            };
            // Drain stdout first so a final response is routed before the exit.
            let _ = reader.await;
            let code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!(agent = %supervised, error = %e, "Failed to wait on agent process");
                    None
                }
            };
            let _ = events.send(AgentEvent::Exited {
                agent: supervised,
                instance,
                code,
            });
        });

        debug!(agent = %name, instance, pid = ?pid, command = %definition.command, "Agent process spawned");
        Ok(Self {
            name,
            instance,
            pid,
            stdin: Mutex::new(stdin),
            kill_tx: parking_lot::Mutex::new(Some(kill_tx)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Write one protocol line. Concurrent writers never interleave.
    pub async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "agent stdin is closed")
        })?;
        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(b'\n');
        let outcome = async {
            stdin.write_all(&framed).await?;
            stdin.flush().await
        }
        .await;
        if outcome.is_err() {
            *guard = None;
        }
        outcome
    }

    /// Ask the supervisor to kill the child. Idempotent.
    pub fn kill(&self) {
        if let Some(tx) = self.kill_tx.lock().take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for AgentProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

async fn read_stdout<R>(
    agent: String,
    instance: u64,
    pid: Option<u32>,
    mut stdout: R,
    events: mpsc::UnboundedSender<AgentEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut buffer = LineBuffer::new();
    let mut chunk = vec![0u8; 8192];
    loop {
        let read = match stdout.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(agent = %agent, error = %e, "Agent stdout read failed");
                break;
            }
        };
        for line in buffer.push(&chunk[..read]) {
            let event = classify_line(&agent, instance, pid, &line);
            if events.send(event).is_err() {
                return;
            }
        }
    }
    if !buffer.remainder().is_empty() {
        debug!(
            agent = %agent,
            bytes = buffer.remainder().len(),
            "Discarding unterminated stdout fragment"
        );
    }
}

fn classify_line(agent: &str, instance: u64, pid: Option<u32>, line: &str) -> AgentEvent {
    let agent = agent.to_string();
    match parse_line(line) {
        Ok(Inbound::Agent(AgentMessage::Register(handshake))) => AgentEvent::Registered {
            agent,
            instance,
            handshake,
            pid,
        },
        Ok(Inbound::Agent(AgentMessage::Response(response))) => AgentEvent::Response {
            agent,
            instance,
            response,
        },
        Ok(Inbound::Other(message)) => AgentEvent::Message {
            agent,
            instance,
            message,
        },
        Err(e) => AgentEvent::ProtocolError {
            agent,
            instance,
            error: e.error,
            raw: e.raw,
        },
    }
}

async fn forward_stderr<R>(
    agent: String,
    instance: u64,
    mut stderr: R,
    events: mpsc::UnboundedSender<AgentEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; 4096];
    loop {
        match stderr.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let data = String::from_utf8_lossy(&chunk[..n]).into_owned();
                if events
                    .send(AgentEvent::Stderr {
                        agent: agent.clone(),
                        instance,
                        data,
                    })
                    .is_err()
                {
                    break;
                }
            }
        }
    }
}
