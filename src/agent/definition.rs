//! Static agent definitions loaded from the registry file.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// How to launch one external agent. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    /// Registry key; filled in from the map key when loading.
    #[serde(default)]
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Layered over the inherited environment.
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Catalog priority override for this agent's tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            auto_start: false,
            description: None,
            priority: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }
}

/// On-disk shape: `{ "agents": { "<name>": AgentDefinition } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub agents: BTreeMap<String, AgentDefinition>,
}

/// Validate one definition. Returns a human-readable reason on failure.
pub fn validate_agent_definition(definition: &AgentDefinition) -> Result<(), String> {
    if definition.name.trim().is_empty() {
        return Err("Agent name cannot be empty".to_string());
    }
    if definition.command.trim().is_empty() {
        return Err(format!(
            "Agent '{}' requires a non-empty command",
            definition.name
        ));
    }
    if let Some(cwd) = &definition.cwd {
        if cwd.as_os_str().is_empty() {
            return Err(format!(
                "Agent '{}' has an empty cwd; omit it to use the registry directory",
                definition.name
            ));
        }
    }
    Ok(())
}

/// Read and parse the registry file.
///
/// Names are taken from the map keys; a relative or missing `cwd` resolves
/// against the registry file's directory. Definitions that fail validation
/// are dropped with a warning rather than failing the whole file.
pub fn load_registry_file(path: &Path) -> Result<BTreeMap<String, AgentDefinition>, ApiError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ApiError::ConfigError(format!(
            "Failed to read agent registry {}: {}",
            path.display(),
            e
        ))
    })?;
    let document: RegistryDocument = serde_json::from_str(&raw).map_err(|e| {
        ApiError::ConfigError(format!(
            "Failed to parse agent registry {}: {}",
            path.display(),
            e
        ))
    })?;

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut definitions = BTreeMap::new();
    for (name, mut definition) in document.agents {
        definition.name = name.clone();
        definition.cwd = Some(match definition.cwd.take() {
            Some(cwd) if cwd.is_absolute() => cwd,
            Some(cwd) => base_dir.join(cwd),
            None => base_dir.clone(),
        });
        if let Err(reason) = validate_agent_definition(&definition) {
            tracing::warn!(agent = %name, "Skipping invalid agent definition: {}", reason);
            continue;
        }
        definitions.insert(name, definition);
    }
    Ok(definitions)
}
