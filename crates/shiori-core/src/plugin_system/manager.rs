use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::Mutex;

use crate::model::{Chapter, Manga};
use crate::plugin_system::context::PluginContext;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::library::LibraryManager;
use crate::plugin_system::loader::{PluginLoader, PluginPackage};
use crate::plugin_system::registry::{PluginRegistry, PluginState};
use crate::plugin_system::state::EnabledStore;
use crate::plugin_system::traits::ShioriPlugin;

/// Orchestrates the plugin lifecycle: discovery, loading, the enabled
/// set, hook fan-out and shutdown.
///
/// The registry sits behind a single async mutex, so enable/disable,
/// registration and hook delivery are serialized. Hooks run synchronously
/// under that lock, in registration order.
pub struct PluginManager {
    registry: Arc<Mutex<PluginRegistry>>,
    loader: Mutex<PluginLoader>,
    library_manager: LibraryManager,
    enabled_store: EnabledStore,
    context: PluginContext,
    /// Enabled flags as last read from disk. Entries for plugins that are
    /// not currently installed survive a save, so a temporarily removed
    /// plugin comes back with its old setting.
    persisted: Mutex<HashMap<String, bool>>,
}

impl Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("library_manager", &self.library_manager)
            .finish_non_exhaustive()
    }
}

impl PluginManager {
    pub fn new(
        loader: PluginLoader,
        library_manager: LibraryManager,
        enabled_store: EnabledStore,
        context: PluginContext,
    ) -> Self {
        Self {
            registry: Arc::new(Mutex::new(PluginRegistry::new())),
            loader: Mutex::new(loader),
            library_manager,
            enabled_store,
            context,
            persisted: Mutex::new(HashMap::new()),
        }
    }

    /// Get a handle to the registry mutex. Intended for tests and
    /// embedders that need direct registry access.
    pub fn registry(&self) -> &Arc<Mutex<PluginRegistry>> {
        &self.registry
    }

    pub fn library_manager(&self) -> &LibraryManager {
        &self.library_manager
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    /// Bring the plugin system up: restore the enabled set, preload shared
    /// libraries, discover and load every package, then initialize the
    /// enabled plugins dependency-first.
    ///
    /// A single package failing to install, load or initialize never
    /// aborts startup; such failures are logged and the plugin is skipped
    /// or left in a failed state. Returns `false` when the plugins
    /// directory cannot be scanned or no plugin ended up registered; the
    /// host is expected to keep running with a degraded feature set
    /// either way.
    pub async fn initialize(&self) -> bool {
        let enabled_flags = match self.enabled_store.load() {
            Ok(flags) => flags,
            Err(e) => {
                warn!(
                    "Could not restore enabled plugin state, starting with all plugins disabled: {}",
                    e
                );
                HashMap::new()
            }
        };
        *self.persisted.lock().await = enabled_flags.clone();

        let mut loader = self.loader.lock().await;
        loader.preload_libraries(&self.library_manager.search_path());

        let packages = match loader.discover_packages().await {
            Ok(packages) => packages,
            Err(e) => {
                error!("Plugin discovery failed: {}", e);
                return false;
            }
        };

        // Installation first, so archives dropped into the directory
        // become loadable package directories this same startup.
        let mut package_dirs = Vec::new();
        for package in packages {
            match package {
                PluginPackage::Directory(dir) => package_dirs.push(dir),
                PluginPackage::Archive(archive) => {
                    match loader.install_archive(&archive).await {
                        Ok(dir) => {
                            if let Err(e) = tokio::fs::remove_file(&archive).await {
                                warn!(
                                    "Failed to remove installed archive '{}': {}",
                                    archive.display(),
                                    e
                                );
                            }
                            package_dirs.push(dir);
                        }
                        Err(e) => {
                            error!("Failed to install '{}': {}", archive.display(), e);
                        }
                    }
                }
            }
        }
        package_dirs.sort();

        let mut registry = self.registry.lock().await;
        for dir in package_dirs {
            match loader.load_package(&dir).await {
                Ok((descriptor, plugin)) => {
                    if let Err(e) = registry.register_plugin(descriptor, plugin) {
                        error!("{}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to load plugin from '{}': {}", dir.display(), e);
                }
            }
        }
        drop(loader);

        // Apply the restored flags to everything registered so far,
        // statically registered plugins included.
        for id in registry.plugin_ids() {
            if enabled_flags.get(&id).copied().unwrap_or(false) {
                registry.enabled.insert(id);
            }
        }

        let init_errors = registry.initialize_enabled(&self.context);
        info!(
            "Plugin system ready: {} plugin(s) loaded, {} enabled, {} initialization failure(s)",
            registry.plugin_count(),
            registry.enabled_count(),
            init_errors.len()
        );

        self.context.update_descriptors(registry.descriptors());
        registry.plugin_count() > 0
    }

    /// Register an already-constructed plugin instance, bypassing the
    /// loader. Used for plugins compiled into the host.
    pub async fn register_static(
        &self,
        descriptor: PluginDescriptor,
        plugin: Arc<dyn ShioriPlugin>,
    ) -> Result<(), PluginSystemError> {
        let mut registry = self.registry.lock().await;
        registry.register_plugin(descriptor, plugin)?;
        self.context.update_descriptors(registry.descriptors());
        Ok(())
    }

    /// Install a plugin archive and load it immediately. The new plugin
    /// starts disabled.
    pub async fn install_archive(&self, archive: &Path) -> Result<String, PluginSystemError> {
        let loader = self.loader.lock().await;
        let dir = loader.install_archive(archive).await?;
        let (descriptor, plugin) = loader.load_package(&dir).await?;
        drop(loader);

        let id = descriptor.id.clone();
        let mut registry = self.registry.lock().await;
        registry.register_plugin(descriptor, plugin)?;
        self.context.update_descriptors(registry.descriptors());
        Ok(id)
    }

    pub async fn get_all_plugins(&self) -> Vec<Arc<dyn ShioriPlugin>> {
        let registry = self.registry.lock().await;
        registry
            .plugin_ids()
            .iter()
            .filter_map(|id| registry.get_plugin(id))
            .collect()
    }

    pub async fn get_all_descriptors(&self) -> Vec<PluginDescriptor> {
        self.registry.lock().await.descriptors()
    }

    /// Plugins that are both enabled and successfully initialized, in
    /// registration order.
    pub async fn get_enabled_plugins(&self) -> Vec<Arc<dyn ShioriPlugin>> {
        let registry = self.registry.lock().await;
        registry
            .plugin_ids()
            .iter()
            .filter(|id| {
                registry.is_enabled(id)
                    && matches!(registry.plugin_state(id), Some(PluginState::Initialized))
            })
            .filter_map(|id| registry.get_plugin(id))
            .collect()
    }

    pub async fn has_plugin(&self, id: &str) -> bool {
        self.registry.lock().await.has_plugin(id)
    }

    pub async fn is_enabled(&self, id: &str) -> bool {
        self.registry.lock().await.is_enabled(id)
    }

    pub async fn plugin_state(&self, id: &str) -> Option<PluginState> {
        self.registry.lock().await.plugin_state(id).cloned()
    }

    pub async fn get_plugin_count(&self) -> usize {
        self.registry.lock().await.plugin_count()
    }

    pub async fn get_enabled_count(&self) -> usize {
        self.registry.lock().await.enabled_count()
    }

    /// Enable a plugin. The first enable initializes it; a plugin that is
    /// already enabled is a no-op. The flag is persisted before
    /// initialization is attempted, so a failed init survives restarts as
    /// an enabled-but-failed plugin rather than silently flipping off.
    pub async fn enable_plugin(&self, id: &str) -> Result<(), PluginSystemError> {
        let mut registry = self.registry.lock().await;
        let changed = registry.enable_plugin(id)?;
        if !changed {
            return Ok(());
        }

        self.persist_enabled(&registry).await?;
        registry.initialize_plugin(id, &self.context)
    }

    /// Disable a plugin. Hook delivery stops immediately; the instance is
    /// kept initialized so re-enabling is cheap. Disabling an unknown
    /// flag state twice is a no-op.
    pub async fn disable_plugin(&self, id: &str) -> Result<(), PluginSystemError> {
        let mut registry = self.registry.lock().await;
        let changed = registry.disable_plugin(id)?;
        if !changed {
            return Ok(());
        }
        self.persist_enabled(&registry).await
    }

    async fn persist_enabled(&self, registry: &PluginRegistry) -> Result<(), PluginSystemError> {
        let mut flags = self.persisted.lock().await;
        for id in registry.plugin_ids() {
            let enabled = registry.is_enabled(&id);
            flags.insert(id, enabled);
        }
        self.enabled_store.save(&flags)
    }

    /// Tell every eligible plugin a series was opened.
    pub async fn notify_manga_loaded(&self, manga: &Manga) -> Vec<PluginSystemError> {
        self.registry.lock().await.notify_manga_loaded(manga)
    }

    /// Tell every eligible plugin a chapter's content arrived.
    pub async fn notify_chapter_loaded(
        &self,
        chapter: &Chapter,
        manga: &Manga,
    ) -> Vec<PluginSystemError> {
        self.registry
            .lock()
            .await
            .notify_chapter_loaded(chapter, manga)
    }

    /// Tell every eligible plugin a chapter was read to the end.
    pub async fn notify_reading_complete(
        &self,
        chapter: &Chapter,
        manga: &Manga,
    ) -> Vec<PluginSystemError> {
        self.registry
            .lock()
            .await
            .notify_reading_complete(chapter, manga)
    }

    /// Shut down every initialized plugin, dependents before their
    /// dependencies, and persist the enabled set one last time.
    pub async fn shutdown(&self) -> Vec<PluginSystemError> {
        let mut registry = self.registry.lock().await;
        let mut errors = registry.shutdown_all();
        if let Err(e) = self.persist_enabled(&registry).await {
            error!("Failed to persist enabled plugin state at shutdown: {}", e);
            errors.push(e);
        }
        errors
    }
}
