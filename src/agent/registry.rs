//! Agent registry: definitions, live processes, runtime info and command
//! correlation.
//!
//! Process tasks report everything through one event channel. A dispatcher
//! task owns the reaction to those events (handshake bookkeeping, exit
//! status, response routing) and rebroadcasts them to subscribers.

use super::definition::{load_registry_file, AgentDefinition};
use super::gateway::AgentGateway;
use super::process::{AgentEvent, AgentProcess};
use super::protocol::HostMessage;
use super::runtime::{AgentRuntimeInfo, AgentStatus};
use crate::error::ApiError;
use crate::types::generate_id;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default time a command waits for its response.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

const EVENT_BROADCAST_CAPACITY: usize = 256;
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

struct PendingCommand {
    agent: String,
    reply: oneshot::Sender<Result<Value, ApiError>>,
}

/// State touched by the event dispatcher.
#[derive(Default)]
struct Shared {
    definitions: RwLock<BTreeMap<String, AgentDefinition>>,
    agents: RwLock<HashMap<String, AgentRuntimeInfo>>,
    pending: Mutex<HashMap<String, PendingCommand>>,
    /// Spawn instance currently owning each agent name.
    live_instances: Mutex<HashMap<String, u64>>,
}

impl Shared {
    fn is_current(&self, agent: &str, instance: u64) -> bool {
        self.live_instances.lock().get(agent) == Some(&instance)
    }

    fn handle(&self, event: &AgentEvent) {
        match event {
            AgentEvent::Registered {
                agent,
                instance,
                handshake,
                pid,
            } => {
                if !self.is_current(agent, *instance) {
                    debug!(agent = %agent, instance, "Ignoring handshake from replaced process");
                    return;
                }
                let Some(definition) = self.definitions.read().get(agent).cloned() else {
                    warn!(agent = %agent, "Handshake from agent without a definition");
                    return;
                };
                let info = AgentRuntimeInfo::from_handshake(&definition, handshake.clone(), *pid);
                info!(
                    agent = %agent,
                    display_name = %info.display_name,
                    tools = info.tools.len(),
                    version = %info.version,
                    "Agent registered"
                );
                // A repeated handshake replaces the previous info.
                self.agents.write().insert(agent.clone(), info);
            }
            AgentEvent::Response {
                agent, response, ..
            } => {
                let removed = self.pending.lock().remove(&response.request_id);
                match removed {
                    Some(entry) if entry.agent == *agent => {
                        let outcome = response.clone().into_result().map_err(|message| {
                            ApiError::CommandFailed {
                                agent: agent.clone(),
                                message,
                            }
                        });
                        if entry.reply.send(outcome).is_err() {
                            debug!(agent = %agent, request_id = %response.request_id, "Caller stopped waiting");
                        }
                    }
                    Some(entry) => {
                        warn!(
                            agent = %agent,
                            owner = %entry.agent,
                            request_id = %response.request_id,
                            "Response for another agent's request ignored"
                        );
                        self.pending
                            .lock()
                            .insert(response.request_id.clone(), entry);
                    }
                    None => {
                        debug!(agent = %agent, request_id = %response.request_id, "Late or unknown response ignored");
                    }
                }
            }
            AgentEvent::Message { agent, message, .. } => {
                debug!(agent = %agent, message = %message, "Agent message");
            }
            AgentEvent::ProtocolError {
                agent, error, raw, ..
            } => {
                warn!(agent = %agent, error = %error, raw = %raw, "Invalid line from agent");
            }
            AgentEvent::Stderr { agent, data, .. } => {
                debug!(agent = %agent, "stderr: {}", data.trim_end());
            }
            AgentEvent::Exited {
                agent,
                instance,
                code,
            } => {
                if !self.is_current(agent, *instance) {
                    debug!(agent = %agent, instance, "Replaced process exited");
                    return;
                }
                info!(agent = %agent, code = ?code, "Agent exited");
                if let Some(info) = self.agents.write().get_mut(agent) {
                    info.status = AgentStatus::Exited;
                }
            }
        }
    }
}

/// Removes a pending entry when the waiting call finishes in any way,
/// including when its future is dropped.
struct PendingSlot<'a> {
    pending: &'a Mutex<HashMap<String, PendingCommand>>,
    request_id: String,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.request_id);
    }
}

/// Supervises external agents and routes commands to them.
///
/// Construct inside a tokio runtime; the event dispatcher is spawned on
/// creation and stops when the registry is dropped.
pub struct AgentRegistry {
    registry_path: PathBuf,
    command_timeout: Duration,
    shared: Arc<Shared>,
    processes: RwLock<HashMap<String, Arc<AgentProcess>>>,
    events_tx: mpsc::UnboundedSender<AgentEvent>,
    observers: broadcast::Sender<AgentEvent>,
    next_instance: AtomicU64,
    dispatcher: JoinHandle<()>,
}

impl AgentRegistry {
    pub fn new(registry_path: impl Into<PathBuf>, command_timeout: Duration) -> Self {
        let shared = Arc::new(Shared::default());
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<AgentEvent>();
        let (observers, _) = broadcast::channel(EVENT_BROADCAST_CAPACITY);

        let dispatch_shared = Arc::clone(&shared);
        let dispatch_observers = observers.clone();
        let dispatcher = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                dispatch_shared.handle(&event);
                // No subscribers is fine.
                let _ = dispatch_observers.send(event);
            }
        });

        Self {
            registry_path: registry_path.into(),
            command_timeout,
            shared,
            processes: RwLock::new(HashMap::new()),
            events_tx,
            observers,
            next_instance: AtomicU64::new(1),
            dispatcher,
        }
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Load definitions from the registry file, replacing any loaded before.
    ///
    /// Never fails: a missing or malformed file leaves the registry empty and
    /// logs the reason. Returns the number of definitions loaded.
    pub fn load_registry(&self) -> usize {
        let definitions = match load_registry_file(&self.registry_path) {
            Ok(definitions) => definitions,
            Err(e) => {
                error!(path = %self.registry_path.display(), error = %e, "Failed to load agent registry");
                BTreeMap::new()
            }
        };
        let count = definitions.len();
        *self.shared.definitions.write() = definitions;
        info!(path = %self.registry_path.display(), agents = count, "Agent registry loaded");
        count
    }

    /// Add or replace a single definition without touching the registry file.
    pub fn define_agent(&self, definition: AgentDefinition) {
        self.shared
            .definitions
            .write()
            .insert(definition.name.clone(), definition);
    }

    pub fn definitions(&self) -> Vec<AgentDefinition> {
        self.shared.definitions.read().values().cloned().collect()
    }

    pub fn definition(&self, name: &str) -> Option<AgentDefinition> {
        self.shared.definitions.read().get(name).cloned()
    }

    /// Load the registry file and start every `autoStart` agent.
    ///
    /// Start failures are logged per agent. Returns the names started.
    pub fn init(&self) -> Vec<String> {
        self.load_registry();
        let auto: Vec<String> = self
            .shared
            .definitions
            .read()
            .values()
            .filter(|d| d.auto_start)
            .map(|d| d.name.clone())
            .collect();

        let mut started = Vec::new();
        for name in auto {
            match self.start_agent(&name) {
                Ok(()) => started.push(name),
                Err(e) => error!(agent = %name, error = %e, "Failed to auto-start agent"),
            }
        }
        started
    }

    /// Spawn (or restart) the named agent.
    ///
    /// A restart kills the old process and discards its runtime info; the
    /// agent is not routable again until the new process completes its
    /// handshake.
    pub fn start_agent(&self, name: &str) -> Result<(), ApiError> {
        let definition = self
            .definition(name)
            .ok_or_else(|| ApiError::AgentNotFound(name.to_string()))?;

        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = self.processes.write().remove(name) {
            info!(agent = %name, "Restarting agent");
            previous.kill();
        }
        self.shared.agents.write().remove(name);
        self.shared
            .live_instances
            .lock()
            .insert(name.to_string(), instance);

        let process = AgentProcess::spawn(&definition, instance, self.events_tx.clone())?;
        info!(agent = %name, pid = ?process.pid(), "Agent started");
        self.processes
            .write()
            .insert(name.to_string(), Arc::new(process));
        Ok(())
    }

    /// Kill the named agent. Its runtime info flips to `exited` once the
    /// process is gone.
    pub fn stop_agent(&self, name: &str) -> Result<(), ApiError> {
        let process = self
            .processes
            .write()
            .remove(name)
            .ok_or_else(|| ApiError::AgentNotFound(name.to_string()))?;
        process.kill();
        info!(agent = %name, "Agent stop requested");
        Ok(())
    }

    /// Kill every running agent.
    pub fn shutdown(&self) {
        let processes: Vec<(String, Arc<AgentProcess>)> =
            self.processes.write().drain().collect();
        for (name, process) in processes {
            debug!(agent = %name, "Stopping agent");
            process.kill();
        }
    }

    pub fn list_agents(&self) -> Vec<AgentRuntimeInfo> {
        let mut agents: Vec<AgentRuntimeInfo> =
            self.shared.agents.read().values().cloned().collect();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        agents
    }

    pub fn get_agent(&self, name: &str) -> Option<AgentRuntimeInfo> {
        self.shared.agents.read().get(name).cloned()
    }

    /// Number of commands awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Receive every agent event as the dispatcher processes it.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.observers.subscribe()
    }

    /// Poll until the agent is online or `timeout` passes.
    pub async fn wait_for_agent(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<AgentRuntimeInfo, ApiError> {
        let start = Instant::now();
        loop {
            if let Some(info) = self.get_agent(name) {
                if info.is_online() {
                    return Ok(info);
                }
            }
            if start.elapsed() >= timeout {
                return Err(match self.get_agent(name) {
                    Some(info) => ApiError::AgentOffline {
                        name: name.to_string(),
                        status: info.status.to_string(),
                    },
                    None => ApiError::AgentNotFound(name.to_string()),
                });
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Send `command` to the named agent and wait for its response.
    ///
    /// Fails without writing anything when the agent has no live process or
    /// is not online. Otherwise the request is registered before the line is
    /// written, and the call settles with the agent's result, the agent's
    /// error, or a timeout after `command_timeout`.
    pub async fn send_command(
        &self,
        name: &str,
        command: &str,
        args: Value,
    ) -> Result<Value, ApiError> {
        let process = self.processes.read().get(name).cloned();
        let status = self.shared.agents.read().get(name).map(|i| i.status);
        let (process, status) = match (process, status) {
            (Some(process), Some(status)) => (process, status),
            _ => return Err(ApiError::AgentNotFound(name.to_string())),
        };
        if status != AgentStatus::Online {
            return Err(ApiError::AgentOffline {
                name: name.to_string(),
                status: status.to_string(),
            });
        }

        let request_id = generate_id("req");
        let line = HostMessage::command(request_id.clone(), command, args)
            .to_line()
            .map_err(|e| ApiError::ProtocolError(e.to_string()))?;

        let (reply, response) = oneshot::channel();
        self.shared.pending.lock().insert(
            request_id.clone(),
            PendingCommand {
                agent: name.to_string(),
                reply,
            },
        );
        let _slot = PendingSlot {
            pending: &self.shared.pending,
            request_id: request_id.clone(),
        };

        debug!(agent = %name, command = %command, request_id = %request_id, "Sending command");
        process
            .write_line(&line)
            .await
            .map_err(|e| ApiError::CommandSendFailed {
                agent: name.to_string(),
                reason: e.to_string(),
            })?;

        match tokio::time::timeout(self.command_timeout, response).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ApiError::CommandSendFailed {
                agent: name.to_string(),
                reason: "response channel closed".to_string(),
            }),
            Err(_) => {
                warn!(agent = %name, request_id = %request_id, "Command timed out");
                Err(ApiError::CommandTimeout {
                    agent: name.to_string(),
                    request_id,
                    timeout_ms: self.command_timeout.as_millis() as u64,
                })
            }
        }
    }
}

#[async_trait]
impl AgentGateway for AgentRegistry {
    fn list_agents(&self) -> Vec<AgentRuntimeInfo> {
        AgentRegistry::list_agents(self)
    }

    async fn send_command(
        &self,
        agent: &str,
        command: &str,
        args: Value,
    ) -> Result<Value, ApiError> {
        AgentRegistry::send_command(self, agent, command, args).await
    }
}

impl Drop for AgentRegistry {
    fn drop(&mut self) {
        self.shutdown();
        self.dispatcher.abort();
    }
}
