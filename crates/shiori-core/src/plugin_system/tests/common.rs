//! Shared fixtures for plugin system tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use crate::model::{Chapter, Manga};
use crate::plugin_system::context::PluginContext;
use crate::plugin_system::descriptor::{
    DescriptorBuilder, PluginCapability, PluginDependency, PluginDescriptor,
};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::ShioriPlugin;
use crate::services::memory::{
    MemoryBookmarkStore, MemoryCacheManager, MemoryContentSource, MemoryMenuRegistry,
    MemoryReadingProgressStore, MemoryRecentItemsStore,
};

/// Scripted failure behavior for [`MockPlugin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    Ok,
    FailInit,
    PanicInit,
    FailHooks,
    PanicHooks,
}

/// Observable in-process plugin. Records every lifecycle call into a
/// shared event log as `"<call>:<id>"` strings so tests can assert on
/// ordering across plugins.
pub struct MockPlugin {
    id: String,
    version: String,
    behavior: MockBehavior,
    pub init_calls: Arc<AtomicUsize>,
    pub events: Arc<StdMutex<Vec<String>>>,
}

impl MockPlugin {
    pub fn new(id: &str, events: Arc<StdMutex<Vec<String>>>) -> Self {
        Self::with_behavior(id, MockBehavior::Ok, events)
    }

    pub fn with_behavior(
        id: &str,
        behavior: MockBehavior,
        events: Arc<StdMutex<Vec<String>>>,
    ) -> Self {
        Self {
            id: id.to_string(),
            version: "1.0.0".to_string(),
            behavior,
            init_calls: Arc::new(AtomicUsize::new(0)),
            events,
        }
    }

    fn record(&self, call: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}", call, self.id));
    }
}

impl ShioriPlugin for MockPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn init(&self, _context: &PluginContext) -> Result<(), PluginSystemError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        self.record("init");
        match self.behavior {
            MockBehavior::FailInit => Err(PluginSystemError::InternalError(format!(
                "{} refuses to start",
                self.id
            ))),
            MockBehavior::PanicInit => panic!("{} panicked in init", self.id),
            _ => Ok(()),
        }
    }

    fn on_manga_loaded(&self, _manga: &Manga) -> Result<(), PluginSystemError> {
        self.record("manga");
        match self.behavior {
            MockBehavior::FailHooks => Err(PluginSystemError::InternalError(format!(
                "{} hook failure",
                self.id
            ))),
            MockBehavior::PanicHooks => panic!("{} panicked in hook", self.id),
            _ => Ok(()),
        }
    }

    fn on_chapter_loaded(
        &self,
        _chapter: &Chapter,
        _manga: &Manga,
    ) -> Result<(), PluginSystemError> {
        self.record("chapter");
        match self.behavior {
            MockBehavior::FailHooks => Err(PluginSystemError::InternalError(format!(
                "{} hook failure",
                self.id
            ))),
            MockBehavior::PanicHooks => panic!("{} panicked in hook", self.id),
            _ => Ok(()),
        }
    }

    fn on_reading_complete(
        &self,
        _chapter: &Chapter,
        _manga: &Manga,
    ) -> Result<(), PluginSystemError> {
        self.record("complete");
        Ok(())
    }

    fn shutdown(&self) -> Result<(), PluginSystemError> {
        self.record("shutdown");
        Ok(())
    }
}

/// Descriptor for a mock plugin with the given capability and deps.
pub fn descriptor(
    id: &str,
    capability: PluginCapability,
    dependencies: Vec<PluginDependency>,
) -> PluginDescriptor {
    let mut builder = DescriptorBuilder::new(id, id, "1.0.0")
        .author("tests")
        .capability(capability);
    for dep in dependencies {
        builder = builder.dependency(dep);
    }
    builder.build()
}

/// A root context backed entirely by in-memory services.
pub fn memory_context() -> PluginContext {
    PluginContext::new(
        Arc::new(MemoryContentSource::new()),
        Arc::new(MemoryBookmarkStore::new()),
        Arc::new(MemoryReadingProgressStore::new()),
        Arc::new(MemoryRecentItemsStore::new()),
        Arc::new(MemoryCacheManager::new()),
        Arc::new(MemoryMenuRegistry::new()),
    )
}

pub fn sample_manga() -> Manga {
    Manga {
        id: "m-1".to_string(),
        title: "Yokohama Kaidashi Kikou".to_string(),
        description: Some("Quiet days after the end".to_string()),
        cover_url: None,
    }
}

pub fn sample_chapter() -> Chapter {
    Chapter {
        id: "c-1".to_string(),
        manga_id: "m-1".to_string(),
        title: Some("Chapter 1".to_string()),
        number: Some("1".to_string()),
        page_count: Some(30),
    }
}
