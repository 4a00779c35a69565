use std::fmt;
use std::sync::{Arc, RwLock};

use crate::plugin_system::descriptor::{PluginCapability, PluginDescriptor};
use crate::plugin_system::error::PluginSystemError;
use crate::services::{
    BookmarkStore, CacheManager, ContentSource, MenuRegistry, ReadingProgressStore,
    RecentItemsStore,
};

/// Capability object handed to each plugin's `init`.
///
/// Constructed once by the host before any plugin initializes; it is the
/// only channel through which a plugin may reach host services. The
/// underlying stores synchronize their own mutation; the context itself is
/// immutable shared state.
///
/// Each plugin receives a view scoped to its declared capability via
/// [`PluginContext::scoped`]; capability-gated operations (currently menu
/// registration) consult that scope.
#[derive(Clone)]
pub struct PluginContext {
    content_source: Arc<dyn ContentSource>,
    bookmarks: Arc<dyn BookmarkStore>,
    reading_progress: Arc<dyn ReadingProgressStore>,
    recent_items: Arc<dyn RecentItemsStore>,
    cache: Arc<dyn CacheManager>,
    menu: Arc<dyn MenuRegistry>,
    /// Registered descriptor snapshot, refreshed by the manager after
    /// registration. Introspection only.
    descriptors: Arc<RwLock<Vec<PluginDescriptor>>>,
    /// The capability this view is scoped to; `None` for the host's
    /// unscoped root context.
    capability: Option<PluginCapability>,
}

impl PluginContext {
    /// Create the root context. Called exactly once by the host.
    pub fn new(
        content_source: Arc<dyn ContentSource>,
        bookmarks: Arc<dyn BookmarkStore>,
        reading_progress: Arc<dyn ReadingProgressStore>,
        recent_items: Arc<dyn RecentItemsStore>,
        cache: Arc<dyn CacheManager>,
        menu: Arc<dyn MenuRegistry>,
    ) -> Self {
        Self {
            content_source,
            bookmarks,
            reading_progress,
            recent_items,
            cache,
            menu,
            descriptors: Arc::new(RwLock::new(Vec::new())),
            capability: None,
        }
    }

    /// A view of this context scoped to one plugin's capability.
    pub fn scoped(&self, capability: PluginCapability) -> Self {
        let mut scoped = self.clone();
        scoped.capability = Some(capability);
        scoped
    }

    /// The capability this view is scoped to, if any.
    pub fn capability(&self) -> Option<PluginCapability> {
        self.capability
    }

    /// Read access to the remote content source.
    pub fn content_source(&self) -> &dyn ContentSource {
        self.content_source.as_ref()
    }

    /// Bookmark persistence.
    pub fn bookmarks(&self) -> &dyn BookmarkStore {
        self.bookmarks.as_ref()
    }

    /// Reading-progress persistence.
    pub fn reading_progress(&self) -> &dyn ReadingProgressStore {
        self.reading_progress.as_ref()
    }

    /// Recently-opened items.
    pub fn recent_items(&self) -> &dyn RecentItemsStore {
        self.recent_items.as_ref()
    }

    /// Downloaded-asset cache.
    pub fn cache(&self) -> &dyn CacheManager {
        self.cache.as_ref()
    }

    /// Register a menu entry for a plugin. Rejected when the view's
    /// capability does not extend the UI.
    pub fn register_menu_item(
        &self,
        plugin_id: &str,
        label: &str,
        action_id: &str,
    ) -> Result<(), PluginSystemError> {
        if let Some(capability) = self.capability {
            if !capability.allows_menu_items() {
                return Err(PluginSystemError::RegistrationError {
                    plugin_id: plugin_id.to_string(),
                    message: format!(
                        "capability '{}' may not contribute menu items",
                        capability
                    ),
                });
            }
        }
        self.menu
            .register_item(plugin_id, label, action_id)
            .map_err(|e| PluginSystemError::RegistrationError {
                plugin_id: plugin_id.to_string(),
                message: format!("menu registration failed: {}", e),
            })
    }

    /// Snapshot of every registered plugin descriptor, insertion order.
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.descriptors.read().map(|d| d.clone()).unwrap_or_default()
    }

    /// Refresh the introspection snapshot. Manager-internal.
    pub(crate) fn update_descriptors(&self, descriptors: Vec<PluginDescriptor>) {
        if let Ok(mut guard) = self.descriptors.write() {
            *guard = descriptors;
        }
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}
