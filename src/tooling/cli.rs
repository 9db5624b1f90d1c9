//! CLI Tooling
//!
//! Command-line interface over the core API: tool catalog, agent discovery
//! and commands, graph tools, and the `serve` request loop.

use crate::agent::{AgentGateway, AgentRegistry};
use crate::api::CoreApi;
use crate::config::{AgentGraphConfig, ConfigLoader};
use crate::error::ApiError;
use crate::graph::{GraphStore, SnapshotStore};
use crate::tooling::format::{
    format_agents_text, format_definitions_text, format_statistics_text, format_tools_text,
};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// agentgraph CLI - knowledge graph and STDIO agent tool router
#[derive(Parser, Debug)]
#[command(name = "agentgraph")]
#[command(about = "Knowledge graph store with a supervised STDIO agent tool router")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the merged tool catalog
    Tools {
        /// Output format (text, json, or functions)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Agent discovery and commands
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },
    /// Run a graph tool, or one of: stats, export, clear
    Graph {
        /// Tool name (e.g. query_graph) or stats/export/clear
        tool: String,
        /// JSON body for the tool
        #[arg(long)]
        body: Option<String>,
        /// Output format for stats (text or json)
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Invoke any catalog tool by name
    Invoke {
        tool: String,
        /// JSON arguments
        #[arg(long)]
        body: Option<String>,
    },
    /// Serve line-delimited JSON requests on stdin/stdout
    Serve,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// List agents that completed a handshake
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List definitions from the registry file
    Definitions {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Send a command to an agent and print its result
    Call {
        name: String,
        command: String,
        /// JSON arguments
        #[arg(long)]
        args: Option<String>,
    },
    /// Start one agent and wait for its handshake
    Start { name: String },
}

impl Commands {
    /// Whether the command needs auto-started agents.
    pub fn needs_agents(&self) -> bool {
        match self {
            Commands::Tools { .. } | Commands::Invoke { .. } | Commands::Serve => true,
            Commands::Agents { command } => {
                matches!(command, AgentCommands::List { .. } | AgentCommands::Call { .. })
            }
            Commands::Graph { .. } => false,
        }
    }
}

/// Load config from `--config` or the layered sources of `workspace_root`.
pub fn load_config(
    workspace_root: &Path,
    config_path: Option<&Path>,
) -> Result<AgentGraphConfig, ApiError> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load(workspace_root)?,
    };
    config.validate()?;
    Ok(config)
}

/// Apply `--log-*` flags over the loaded logging config.
pub fn apply_log_overrides(cli: &Cli, config: &mut AgentGraphConfig) {
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    if let Some(output) = &cli.log_output {
        config.logging.output = output.clone();
    }
    if let Some(file) = &cli.log_file {
        config.logging.file = Some(file.clone());
    }
}

fn parse_json_arg(label: &str, raw: Option<&str>) -> Result<Value, ApiError> {
    match raw {
        None => Ok(Value::Object(Default::default())),
        Some(text) => serde_json::from_str(text).map_err(|e| ApiError::InvalidArguments {
            tool: label.to_string(),
            reason: format!("invalid JSON: {}", e),
        }),
    }
}

fn to_pretty<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::ProtocolError(e.to_string()))
}

/// CLI context owning the graph, the agent registry, and the API over both.
///
/// Must be created inside a tokio runtime.
pub struct CliContext {
    api: Arc<CoreApi>,
    registry: Arc<AgentRegistry>,
    config: AgentGraphConfig,
    workspace_root: PathBuf,
}

impl CliContext {
    /// Create a new CLI context
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = load_config(&workspace_root, config_path.as_deref())?;
        Self::from_config(workspace_root, config)
    }

    pub fn from_config(workspace_root: PathBuf, config: AgentGraphConfig) -> Result<Self, ApiError> {
        let (registry_path, snapshot_path) = config.storage.resolve_paths(&workspace_root)?;

        let registry = Arc::new(AgentRegistry::new(
            registry_path,
            config.agents.command_timeout(),
        ));
        registry.load_registry();

        let gateway: Arc<dyn AgentGateway> = registry.clone();
        let api = CoreApi::new(
            Arc::new(RwLock::new(GraphStore::new())),
            gateway,
            config.catalog,
        )
        .with_snapshots(SnapshotStore::new(snapshot_path));
        api.load_snapshot();

        Ok(Self {
            api: Arc::new(api),
            registry,
            config,
            workspace_root,
        })
    }

    pub fn api(&self) -> &Arc<CoreApi> {
        &self.api
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &AgentGraphConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Start every `autoStart` agent and wait (bounded) for their handshakes.
    pub async fn start_agents(&self) -> Vec<String> {
        let started = self.registry.init();
        let wait = self.config.agents.handshake_wait();
        let outcomes = join_all(
            started
                .iter()
                .map(|name| self.registry.wait_for_agent(name, wait)),
        )
        .await;

        let mut online = Vec::new();
        for (name, outcome) in started.into_iter().zip(outcomes) {
            match outcome {
                Ok(_) => online.push(name),
                Err(e) => warn!(agent = %name, error = %e, "Agent did not come online"),
            }
        }
        info!(online = online.len(), "Agents ready");
        online
    }

    /// Execute a CLI command. `serve` is handled by the binary since it owns
    /// stdin and stdout.
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Tools { format } => {
                let catalog = self.api.list_tools();
                match format.as_str() {
                    "json" => to_pretty(&catalog),
                    "functions" => to_pretty(&catalog.function_specs()),
                    _ => Ok(format_tools_text(&catalog)),
                }
            }
            Commands::Agents { command } => self.handle_agent_command(command).await,
            Commands::Graph { tool, body, format } => {
                self.handle_graph_command(tool, body.as_deref(), format)
            }
            Commands::Invoke { tool, body } => {
                let args = parse_json_arg(tool, body.as_deref())?;
                let result = self.api.invoke_tool(tool, args).await?;
                to_pretty(&result)
            }
            Commands::Serve => Err(ApiError::ConfigError(
                "serve must be run through the agentgraph binary".to_string(),
            )),
        }
    }

    async fn handle_agent_command(&self, command: &AgentCommands) -> Result<String, ApiError> {
        match command {
            AgentCommands::List { format } => {
                let agents = self.api.list_agents();
                match format.as_str() {
                    "json" => to_pretty(&agents),
                    _ => Ok(format_agents_text(&agents)),
                }
            }
            AgentCommands::Definitions { format } => {
                let definitions = self.registry.definitions();
                match format.as_str() {
                    "json" => to_pretty(&definitions),
                    _ => Ok(format_definitions_text(&definitions)),
                }
            }
            AgentCommands::Call {
                name,
                command,
                args,
            } => {
                let args = parse_json_arg(command, args.as_deref())?;
                let result = self.api.agent_command(name, command, args).await?;
                to_pretty(&result)
            }
            AgentCommands::Start { name } => {
                self.registry.start_agent(name)?;
                let info = self
                    .registry
                    .wait_for_agent(name, self.config.agents.handshake_wait())
                    .await?;
                to_pretty(&info)
            }
        }
    }

    fn handle_graph_command(
        &self,
        tool: &str,
        body: Option<&str>,
        format: &str,
    ) -> Result<String, ApiError> {
        match tool {
            "stats" => {
                let stats = self.api.statistics();
                match format {
                    "text" => Ok(format_statistics_text(&stats)),
                    _ => to_pretty(&stats),
                }
            }
            "export" => to_pretty(&self.api.export()),
            "clear" => to_pretty(&self.api.clear()),
            _ => {
                let body = parse_json_arg(tool, body)?;
                to_pretty(&self.api.invoke_graph_tool(tool, body)?)
            }
        }
    }

    /// Kill agents started by this context.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }
}
