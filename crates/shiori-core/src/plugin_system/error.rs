//! # Shiori Core Plugin System Errors
//!
//! Defines [`PluginSystemError`], the typed error enum for every plugin
//! operation: package loading, archive installation, manifest parsing,
//! registration, dependency resolution, initialization, notification
//! fan-out, shutdown, and enabled-set persistence. Every variant carries
//! the identity of the offending package or plugin so failures can be
//! attributed in logs without crashing the host.
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin loading failed for '{plugin_id}': {source}")]
    LoadingError {
        plugin_id: String,
        path: Option<PathBuf>,
        #[source]
        source: Box<PluginSystemErrorSource>,
    },

    #[error("Rejected archive {archive:?}: unsafe entry '{entry}'")]
    MaliciousArchive {
        archive: PathBuf,
        entry: String,
    },

    #[error("Plugin manifest error for {path:?}: {message}")]
    ManifestError {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Plugin registration error for '{plugin_id}': {message}")]
    RegistrationError {
        plugin_id: String,
        message: String,
    },

    #[error("Plugin '{plugin_id}' is missing dependency '{dependency}': {reason}")]
    MissingDependency {
        plugin_id: String,
        dependency: String,
        reason: String,
    },

    #[error("Plugin initialization error for '{plugin_id}': {message}")]
    InitializationError {
        plugin_id: String,
        message: String,
    },

    #[error("Plugin '{plugin_id}' failed during '{hook}' notification: {message}")]
    NotificationError {
        plugin_id: String,
        hook: String,
        message: String,
    },

    #[error("Plugin shutdown error for '{plugin_id}': {message}")]
    ShutdownError {
        plugin_id: String,
        message: String,
    },

    #[error("Enabled-state persistence error: {message}")]
    PersistenceError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Internal plugin system error: {0}")]
    InternalError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemErrorSource {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error("Other: {0}")]
    Other(String),
}
