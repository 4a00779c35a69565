use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::plugin_system::error::PluginSystemError;
use crate::storage::StorageProvider;

/// Persisted enabled-set: plugin id -> should-be-active flag.
///
/// Read once at manager initialization and rewritten (atomically, through
/// the storage provider) on every enable/disable mutation. A plugin id
/// absent from the map falls back to the default passed at read time.
pub struct EnabledStore {
    provider: Arc<dyn StorageProvider>,
    /// Path of the state file, relative to the provider's base
    path: PathBuf,
}

impl EnabledStore {
    pub fn new(provider: Arc<dyn StorageProvider>, path: PathBuf) -> Self {
        Self { provider, path }
    }

    /// Load the persisted map. A missing file is an empty map, not an
    /// error; an unreadable or unparseable file is a `PersistenceError`
    /// the caller downgrades to "everything disabled".
    pub fn load(&self) -> Result<HashMap<String, bool>, PluginSystemError> {
        if !self.provider.exists(&self.path) {
            return Ok(HashMap::new());
        }
        let content = self.provider.read_to_string(&self.path).map_err(|e| {
            PluginSystemError::PersistenceError {
                message: format!("failed to read enabled-state file '{}'", self.path.display()),
                source: Some(Box::new(e)),
            }
        })?;
        serde_json::from_str(&content).map_err(|e| PluginSystemError::PersistenceError {
            message: format!("failed to parse enabled-state file '{}'", self.path.display()),
            source: Some(Box::new(e)),
        })
    }

    /// Persist the full map, replacing the previous file atomically.
    pub fn save(&self, state: &HashMap<String, bool>) -> Result<(), PluginSystemError> {
        let content = serde_json::to_string_pretty(state).map_err(|e| {
            PluginSystemError::PersistenceError {
                message: "failed to serialize enabled-state".to_string(),
                source: Some(Box::new(e)),
            }
        })?;
        self.provider.write_string(&self.path, &content).map_err(|e| {
            PluginSystemError::PersistenceError {
                message: format!("failed to write enabled-state file '{}'", self.path.display()),
                source: Some(Box::new(e)),
            }
        })
    }
}

impl std::fmt::Debug for EnabledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnabledStore").field("path", &self.path).finish()
    }
}
