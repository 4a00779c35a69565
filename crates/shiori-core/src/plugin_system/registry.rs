use std::collections::{HashMap, HashSet, VecDeque};
use std::panic;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::kernel::constants::HOOK_BUDGET_MS;
use crate::model::{Chapter, Manga};
use crate::plugin_system::context::PluginContext;
use crate::plugin_system::descriptor::{HookKind, PluginDescriptor};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::ShioriPlugin;

/// Lifecycle state of a registered plugin.
///
/// Failure states are sticky: a plugin that failed to initialize or has
/// an unsatisfiable dependency stays failed until the next full
/// initialization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginState {
    /// Registered but not yet initialized.
    Registered,
    /// Initialized and receiving hooks while enabled.
    Initialized,
    /// `init` returned an error or panicked.
    InitFailed(String),
    /// A required dependency is missing, disabled or version-incompatible.
    MissingDependency(String),
}

struct PluginEntry {
    descriptor: PluginDescriptor,
    plugin: Arc<dyn ShioriPlugin>,
    state: PluginState,
}

/// In-memory registry of loaded plugins.
///
/// Not internally synchronized; the manager holds it behind a single
/// `tokio::sync::Mutex` so every mutation happens under one lock.
pub struct PluginRegistry {
    plugins: HashMap<String, PluginEntry>,
    /// Registration order, which is also hook delivery order.
    order: Vec<String>,
    /// Initialization order, for reverse-order shutdown.
    init_order: Vec<String>,
    /// Enabled plugin IDs.
    pub enabled: HashSet<String>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
            order: Vec::new(),
            init_order: Vec::new(),
            enabled: HashSet::new(),
        }
    }

    /// Register a plugin. The first registration of an ID wins; a second
    /// registration under the same ID is rejected and the original entry
    /// is untouched.
    pub fn register_plugin(
        &mut self,
        descriptor: PluginDescriptor,
        plugin: Arc<dyn ShioriPlugin>,
    ) -> Result<(), PluginSystemError> {
        let id = descriptor.id.clone();
        if self.plugins.contains_key(&id) {
            return Err(PluginSystemError::RegistrationError {
                plugin_id: id,
                message: "a plugin with this ID is already registered".to_string(),
            });
        }

        debug!("Registered plugin '{}' v{}", id, descriptor.version);
        self.plugins.insert(
            id.clone(),
            PluginEntry {
                descriptor,
                plugin,
                state: PluginState::Registered,
            },
        );
        self.order.push(id);
        Ok(())
    }

    pub fn has_plugin(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    pub fn get_plugin(&self, id: &str) -> Option<Arc<dyn ShioriPlugin>> {
        self.plugins.get(id).map(|entry| entry.plugin.clone())
    }

    pub fn get_descriptor(&self, id: &str) -> Option<&PluginDescriptor> {
        self.plugins.get(id).map(|entry| &entry.descriptor)
    }

    pub fn plugin_state(&self, id: &str) -> Option<&PluginState> {
        self.plugins.get(id).map(|entry| &entry.state)
    }

    /// Plugin IDs in registration order.
    pub fn plugin_ids(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.order
            .iter()
            .filter_map(|id| self.plugins.get(id))
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn enabled_count(&self) -> usize {
        self.order.iter().filter(|id| self.enabled.contains(*id)).count()
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.enabled.contains(id)
    }

    /// Mark a plugin enabled. Returns `true` if the flag changed.
    pub fn enable_plugin(&mut self, id: &str) -> Result<bool, PluginSystemError> {
        if !self.plugins.contains_key(id) {
            return Err(PluginSystemError::PluginNotFound(id.to_string()));
        }
        Ok(self.enabled.insert(id.to_string()))
    }

    /// Mark a plugin disabled. Disabling stops hook delivery but tears
    /// nothing down; the instance stays initialized for a cheap re-enable.
    /// Returns `true` if the flag changed.
    pub fn disable_plugin(&mut self, id: &str) -> Result<bool, PluginSystemError> {
        if !self.plugins.contains_key(id) {
            return Err(PluginSystemError::PluginNotFound(id.to_string()));
        }
        Ok(self.enabled.remove(id))
    }

    /// Dependency-first order over the registered plugins, computed with
    /// Kahn's algorithm. Optional dependencies contribute ordering edges
    /// when their target is registered, so a present optional dependency
    /// initializes before its dependent; absent ones are ignored. Plugins
    /// caught in a dependency cycle are appended in registration order
    /// after a warning, leaving it to the dependency check to reject
    /// whatever is genuinely unsatisfiable.
    pub fn topological_order(&self) -> Vec<String> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for id in &self.order {
            in_degree.entry(id.as_str()).or_insert(0);
            let entry = &self.plugins[id];
            for dep in &entry.descriptor.dependencies {
                if self.plugins.contains_key(&dep.plugin_id) {
                    *in_degree.entry(id.as_str()).or_insert(0) += 1;
                    dependents
                        .entry(dep.plugin_id.as_str())
                        .or_default()
                        .push(id);
                }
            }
        }

        // Seed with zero-degree nodes in registration order so the
        // result is deterministic.
        let mut queue: VecDeque<&str> = self
            .order
            .iter()
            .map(String::as_str)
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut sorted = Vec::with_capacity(self.order.len());
        while let Some(id) = queue.pop_front() {
            sorted.push(id.to_string());
            if let Some(children) = dependents.get(id) {
                for child in children {
                    let degree = in_degree.get_mut(child).unwrap();
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }

        if sorted.len() < self.order.len() {
            for id in &self.order {
                if !sorted.contains(id) {
                    warn!("Plugin '{}' is part of a dependency cycle", id);
                    sorted.push(id.clone());
                }
            }
        }

        sorted
    }

    /// Whether every required dependency of `id` is registered, enabled,
    /// initialized and version-compatible. Returns the first violation.
    fn check_dependencies(&self, id: &str) -> Result<(), PluginSystemError> {
        let entry = self
            .plugins
            .get(id)
            .ok_or_else(|| PluginSystemError::PluginNotFound(id.to_string()))?;

        for dep in &entry.descriptor.dependencies {
            let target = self.plugins.get(&dep.plugin_id);
            match target {
                None if dep.required => {
                    return Err(PluginSystemError::MissingDependency {
                        plugin_id: id.to_string(),
                        dependency: dep.plugin_id.clone(),
                        reason: "not installed".to_string(),
                    });
                }
                None => continue,
                Some(target) => {
                    if !dep.is_compatible_with(&target.descriptor.version) {
                        if dep.required {
                            return Err(PluginSystemError::MissingDependency {
                                plugin_id: id.to_string(),
                                dependency: dep.plugin_id.clone(),
                                reason: format!(
                                    "installed version {} does not satisfy '{}'",
                                    target.descriptor.version, dep
                                ),
                            });
                        }
                        continue;
                    }
                    if dep.required {
                        if !self.enabled.contains(&dep.plugin_id) {
                            return Err(PluginSystemError::MissingDependency {
                                plugin_id: id.to_string(),
                                dependency: dep.plugin_id.clone(),
                                reason: "disabled".to_string(),
                            });
                        }
                        if target.state != PluginState::Initialized {
                            return Err(PluginSystemError::MissingDependency {
                                plugin_id: id.to_string(),
                                dependency: dep.plugin_id.clone(),
                                reason: "not initialized".to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Initialize a single plugin, dependency checks included. Idempotent
    /// for already-initialized plugins. A panic or error inside `init`
    /// marks the plugin failed without affecting any other plugin.
    ///
    /// `InitFailed` is terminal for the process: once `init` has failed,
    /// no disable/enable cycle re-runs it. Recovery requires
    /// reinstallation and a restart.
    pub fn initialize_plugin(
        &mut self,
        id: &str,
        context: &PluginContext,
    ) -> Result<(), PluginSystemError> {
        let state = self
            .plugin_state(id)
            .ok_or_else(|| PluginSystemError::PluginNotFound(id.to_string()))?;
        match state {
            PluginState::Initialized => return Ok(()),
            PluginState::InitFailed(message) => {
                return Err(PluginSystemError::InitializationError {
                    plugin_id: id.to_string(),
                    message: message.clone(),
                });
            }
            PluginState::Registered | PluginState::MissingDependency(_) => {}
        }

        if let Err(e) = self.check_dependencies(id) {
            if let Some(entry) = self.plugins.get_mut(id) {
                entry.state = PluginState::MissingDependency(e.to_string());
            }
            return Err(e);
        }

        let entry = self.plugins.get_mut(id).unwrap();
        let scoped = context.scoped(entry.descriptor.capability);
        let plugin = entry.plugin.clone();

        let outcome =
            panic::catch_unwind(panic::AssertUnwindSafe(|| plugin.init(&scoped)));
        match outcome {
            Ok(Ok(())) => {
                entry.state = PluginState::Initialized;
                self.init_order.push(id.to_string());
                info!("Initialized plugin '{}'", id);
                Ok(())
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                entry.state = PluginState::InitFailed(message.clone());
                Err(PluginSystemError::InitializationError {
                    plugin_id: id.to_string(),
                    message,
                })
            }
            Err(_) => {
                let message = "init panicked".to_string();
                entry.state = PluginState::InitFailed(message.clone());
                Err(PluginSystemError::InitializationError {
                    plugin_id: id.to_string(),
                    message,
                })
            }
        }
    }

    /// Initialize every enabled plugin, dependencies first. One plugin
    /// failing never stops the others. Returns the errors collected along
    /// the way.
    pub fn initialize_enabled(&mut self, context: &PluginContext) -> Vec<PluginSystemError> {
        let mut errors = Vec::new();
        for id in self.topological_order() {
            if !self.enabled.contains(&id) {
                continue;
            }
            if let Err(e) = self.initialize_plugin(&id, context) {
                error!("Failed to initialize plugin '{}': {}", id, e);
                errors.push(e);
            }
        }
        errors
    }

    /// Deliver a hook to every eligible plugin: enabled, initialized and
    /// capability-eligible for this hook kind, in registration order. Each
    /// delivery is individually isolated; an error or panic in one plugin
    /// is recorded and the fan-out continues. Deliveries that overrun the
    /// per-hook time budget are logged but not interrupted.
    fn dispatch_hook<F>(&self, hook: HookKind, call: F) -> Vec<PluginSystemError>
    where
        F: Fn(&dyn ShioriPlugin) -> Result<(), PluginSystemError>,
    {
        let mut errors = Vec::new();
        for id in &self.order {
            let entry = &self.plugins[id];
            if !self.enabled.contains(id)
                || entry.state != PluginState::Initialized
                || !entry.descriptor.capability.allows_hook(hook)
            {
                continue;
            }

            let started = Instant::now();
            let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| {
                call(entry.plugin.as_ref())
            }));
            let elapsed = started.elapsed();
            if elapsed.as_millis() as u64 > HOOK_BUDGET_MS {
                warn!(
                    "Plugin '{}' took {}ms handling {} (budget {}ms)",
                    id,
                    elapsed.as_millis(),
                    hook,
                    HOOK_BUDGET_MS
                );
            }

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    let err = PluginSystemError::NotificationError {
                        plugin_id: id.clone(),
                        hook: hook.to_string(),
                        message: e.to_string(),
                    };
                    error!("{}", err);
                    errors.push(err);
                }
                Err(_) => {
                    let err = PluginSystemError::NotificationError {
                        plugin_id: id.clone(),
                        hook: hook.to_string(),
                        message: "hook panicked".to_string(),
                    };
                    error!("{}", err);
                    errors.push(err);
                }
            }
        }
        errors
    }

    pub fn notify_manga_loaded(&self, manga: &Manga) -> Vec<PluginSystemError> {
        self.dispatch_hook(HookKind::MangaLoaded, |plugin| plugin.on_manga_loaded(manga))
    }

    pub fn notify_chapter_loaded(
        &self,
        chapter: &Chapter,
        manga: &Manga,
    ) -> Vec<PluginSystemError> {
        self.dispatch_hook(HookKind::ChapterLoaded, |plugin| {
            plugin.on_chapter_loaded(chapter, manga)
        })
    }

    pub fn notify_reading_complete(
        &self,
        chapter: &Chapter,
        manga: &Manga,
    ) -> Vec<PluginSystemError> {
        self.dispatch_hook(HookKind::ReadingComplete, |plugin| {
            plugin.on_reading_complete(chapter, manga)
        })
    }

    /// Shut down every initialized plugin in reverse initialization order,
    /// so dependents stop before their dependencies. Failures are logged
    /// and collected; every plugin gets its shutdown call regardless.
    pub fn shutdown_all(&mut self) -> Vec<PluginSystemError> {
        let mut errors = Vec::new();
        for id in self.init_order.iter().rev() {
            let entry = match self.plugins.get(id) {
                Some(entry) if entry.state == PluginState::Initialized => entry,
                _ => continue,
            };

            let plugin = entry.plugin.clone();
            let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| plugin.shutdown()));
            match outcome {
                Ok(Ok(())) => debug!("Plugin '{}' shut down", id),
                Ok(Err(e)) => {
                    let err = PluginSystemError::ShutdownError {
                        plugin_id: id.clone(),
                        message: e.to_string(),
                    };
                    error!("{}", err);
                    errors.push(err);
                }
                Err(_) => {
                    let err = PluginSystemError::ShutdownError {
                        plugin_id: id.clone(),
                        message: "shutdown panicked".to_string(),
                    };
                    error!("{}", err);
                    errors.push(err);
                }
            }
        }

        for entry in self.plugins.values_mut() {
            if entry.state == PluginState::Initialized {
                entry.state = PluginState::Registered;
            }
        }
        self.init_order.clear();
        errors
    }
}
