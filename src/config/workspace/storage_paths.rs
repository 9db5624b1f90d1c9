//! StorageConfig and resolve_paths for the registry and snapshot files.

use crate::config::paths;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub(crate) fn default_registry_path() -> PathBuf {
    PathBuf::from("agent-registry.json")
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Agent registry file (relative to workspace root)
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Graph snapshot file; `None` uses the XDG data directory
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve to `(registry_path, snapshot_path)` on disk.
    ///
    /// Relative paths are joined onto `workspace_root`; absolute paths are
    /// used as given.
    pub fn resolve_paths(&self, workspace_root: &Path) -> Result<(PathBuf, PathBuf), ApiError> {
        let registry_path = anchor(workspace_root, &self.registry_path);
        let snapshot_path = match &self.snapshot_path {
            Some(path) => anchor(workspace_root, path),
            None => paths::default_snapshot_path()?,
        };
        Ok((registry_path, snapshot_path))
    }
}

fn anchor(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            snapshot_path: None,
        }
    }
}
