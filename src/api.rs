//! Core API
//!
//! The boundary operations: list agents, command an agent, list the merged
//! tool catalog, and invoke tools. Graph mutations are followed by a
//! best-effort snapshot save.

use crate::agent::{AgentGateway, AgentRuntimeInfo};
use crate::catalog::{execute_graph_tool, route, BuiltinTool, CatalogSettings, Route, ToolCatalog};
use crate::error::ApiError;
use crate::graph::{GraphExport, GraphStatistics, GraphStore, SnapshotStore};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub struct CoreApi {
    graph: Arc<RwLock<GraphStore>>,
    agents: Arc<dyn AgentGateway>,
    catalog: CatalogSettings,
    snapshots: Option<SnapshotStore>,
    save_lock: Mutex<()>,
}

impl CoreApi {
    pub fn new(
        graph: Arc<RwLock<GraphStore>>,
        agents: Arc<dyn AgentGateway>,
        catalog: CatalogSettings,
    ) -> Self {
        Self {
            graph,
            agents,
            catalog,
            snapshots: None,
            save_lock: Mutex::new(()),
        }
    }

    /// Persist the graph to `snapshots` after every mutation.
    pub fn with_snapshots(mut self, snapshots: SnapshotStore) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn graph(&self) -> &Arc<RwLock<GraphStore>> {
        &self.graph
    }

    pub fn snapshots(&self) -> Option<&SnapshotStore> {
        self.snapshots.as_ref()
    }

    /// Replace the in-memory graph with the snapshot on disk, if one loads.
    pub fn load_snapshot(&self) -> bool {
        match &self.snapshots {
            Some(snapshots) => snapshots.load_into(&mut self.graph.write()),
            None => false,
        }
    }

    pub fn list_agents(&self) -> Vec<AgentRuntimeInfo> {
        self.agents.list_agents()
    }

    pub async fn agent_command(
        &self,
        agent: &str,
        command: &str,
        args: Value,
    ) -> Result<Value, ApiError> {
        self.agents.send_command(agent, command, args).await
    }

    /// Catalog derived from the agents online right now.
    pub fn list_tools(&self) -> ToolCatalog {
        ToolCatalog::build(&self.agents.list_agents(), &self.catalog)
    }

    /// Invoke a built-in graph tool by name and return its envelope.
    pub fn invoke_graph_tool(&self, tool: &str, body: Value) -> Result<Value, ApiError> {
        let builtin = BuiltinTool::from_name(tool)
            .filter(|t| t.is_graph_tool())
            .ok_or_else(|| ApiError::UnknownTool(tool.to_string()))?;
        self.run_graph_tool(builtin, body)
    }

    /// Invoke any catalog tool by its exposed name.
    ///
    /// Graph tools return their envelope; agent tools return the agent's
    /// result unchanged.
    pub async fn invoke_tool(&self, name: &str, args: Value) -> Result<Value, ApiError> {
        let catalog = self.list_tools();
        match route(&catalog, name, args)? {
            Route::Graph { tool, body } => self.run_graph_tool(tool, body),
            Route::Agent {
                agent,
                command,
                args,
            } => {
                debug!(tool = %name, agent = %agent, command = %command, "Routing tool call to agent");
                self.agents.send_command(&agent, &command, args).await
            }
        }
    }

    pub fn statistics(&self) -> GraphStatistics {
        self.graph.read().statistics()
    }

    pub fn export(&self) -> GraphExport {
        self.graph.read().export()
    }

    pub fn clear(&self) -> Value {
        let before = {
            let mut graph = self.graph.write();
            let before = graph.statistics();
            graph.clear();
            before
        };
        info!(
            entities = before.entities,
            relations = before.relations,
            observations = before.observations,
            "Graph cleared"
        );
        self.persist();
        json!({ "success": true, "cleared": before })
    }

    fn run_graph_tool(&self, tool: BuiltinTool, body: Value) -> Result<Value, ApiError> {
        let envelope = execute_graph_tool(&self.graph, tool, body)?;
        if tool.is_mutation() {
            self.persist();
        }
        Ok(envelope)
    }

    fn persist(&self) {
        if let Some(snapshots) = &self.snapshots {
            let _serialized = self.save_lock.lock();
            snapshots.save_best_effort(&self.graph.read());
        }
    }
}
