//! Reading tracker plugin.
//!
//! Keeps the recently-read list current and marks chapters fully read.
//! Ships with the host binary via static registration, and doubles as the
//! reference implementation of the [`ShioriPlugin`] contract for
//! out-of-tree plugin authors.

use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use shiori_core::model::{Chapter, Manga, RecentEntry};
use shiori_core::plugin_system::context::PluginContext;
use shiori_core::plugin_system::descriptor::{DescriptorBuilder, PluginCapability, PluginDescriptor};
use shiori_core::plugin_system::error::PluginSystemError;
use shiori_core::ShioriPlugin;

pub const PLUGIN_ID: &str = "reading-tracker";

pub struct ReadingTrackerPlugin {
    /// Context captured at init; hooks run strictly after init completes.
    context: RwLock<Option<PluginContext>>,
}

impl ReadingTrackerPlugin {
    pub fn new() -> Self {
        Self {
            context: RwLock::new(None),
        }
    }

    pub fn descriptor() -> PluginDescriptor {
        DescriptorBuilder::new(PLUGIN_ID, "Reading Tracker", env!("CARGO_PKG_VERSION"))
            .author("Shiori Developers")
            .description("Tracks recently opened series and completed chapters")
            .license("MIT")
            .capability(PluginCapability::Analytics)
            .build()
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn with_context<R>(
        &self,
        f: impl FnOnce(&PluginContext) -> Result<R, PluginSystemError>,
    ) -> Result<R, PluginSystemError> {
        let guard = self
            .context
            .read()
            .map_err(|_| PluginSystemError::InternalError("tracker context lock poisoned".into()))?;
        match guard.as_ref() {
            Some(context) => f(context),
            None => Err(PluginSystemError::InternalError(
                "reading-tracker received a hook before init".into(),
            )),
        }
    }
}

impl Default for ReadingTrackerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ShioriPlugin for ReadingTrackerPlugin {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn name(&self) -> &str {
        "Reading Tracker"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&self, context: &PluginContext) -> Result<(), PluginSystemError> {
        *self
            .context
            .write()
            .map_err(|_| PluginSystemError::InternalError("tracker context lock poisoned".into()))? =
            Some(context.clone());
        info!("Reading tracker ready");
        Ok(())
    }

    fn on_manga_loaded(&self, manga: &Manga) -> Result<(), PluginSystemError> {
        self.with_context(|context| {
            context
                .recent_items()
                .touch(RecentEntry {
                    manga_id: manga.id.clone(),
                    manga_title: manga.title.clone(),
                    opened_at: Self::now_secs(),
                })
                .map_err(|e| PluginSystemError::InternalError(e.to_string()))?;
            debug!("Recorded recent entry for '{}'", manga.title);
            Ok(())
        })
    }

    fn on_reading_complete(
        &self,
        chapter: &Chapter,
        manga: &Manga,
    ) -> Result<(), PluginSystemError> {
        self.with_context(|context| {
            let last_page = chapter.page_count.unwrap_or(0).saturating_sub(1);
            context
                .reading_progress()
                .save_progress(&manga.id, &chapter.id, last_page)
                .map_err(|e| PluginSystemError::InternalError(e.to_string()))?;
            debug!(
                "Marked chapter '{}' of '{}' as finished",
                chapter.id, manga.title
            );
            Ok(())
        })
    }
}

shiori_core::declare_plugin!(ReadingTrackerPlugin, ReadingTrackerPlugin::default);
