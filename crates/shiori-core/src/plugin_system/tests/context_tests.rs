use std::sync::Arc;

use super::common::{descriptor, memory_context};
use crate::model::Bookmark;
use crate::plugin_system::context::PluginContext;
use crate::plugin_system::descriptor::PluginCapability;
use crate::plugin_system::error::PluginSystemError;
use crate::services::memory::{
    MemoryBookmarkStore, MemoryCacheManager, MemoryContentSource, MemoryMenuRegistry,
    MemoryReadingProgressStore, MemoryRecentItemsStore,
};
use crate::services::MenuRegistry;

/// Root context plus a handle onto its menu registry for assertions.
fn context_with_menu() -> (PluginContext, Arc<MemoryMenuRegistry>) {
    let menu = Arc::new(MemoryMenuRegistry::new());
    let context = PluginContext::new(
        Arc::new(MemoryContentSource::new()),
        Arc::new(MemoryBookmarkStore::new()),
        Arc::new(MemoryReadingProgressStore::new()),
        Arc::new(MemoryRecentItemsStore::new()),
        Arc::new(MemoryCacheManager::new()),
        menu.clone(),
    );
    (context, menu)
}

#[test]
fn scoped_views_carry_their_capability() {
    let context = memory_context();
    assert_eq!(context.capability(), None);

    let scoped = context.scoped(PluginCapability::ImageProcessing);
    assert_eq!(scoped.capability(), Some(PluginCapability::ImageProcessing));
    // Scoping is a view, not a mutation of the root context.
    assert_eq!(context.capability(), None);
}

#[test]
fn menu_registration_is_capability_gated() {
    let (context, menu) = context_with_menu();

    let ui = context.scoped(PluginCapability::UiExtension);
    ui.register_menu_item("themes", "Theme settings", "themes.settings")
        .unwrap();

    let general = context.scoped(PluginCapability::General);
    general
        .register_menu_item("utils", "Utilities", "utils.open")
        .unwrap();

    let analytics = context.scoped(PluginCapability::Analytics);
    let denied = analytics.register_menu_item("tracker", "Stats", "tracker.stats");
    assert!(matches!(
        denied,
        Err(PluginSystemError::RegistrationError { .. })
    ));

    // Only the permitted registrations went through.
    let items = menu.items().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|(plugin, _, _)| plugin != "tracker"));
}

#[test]
fn unscoped_root_context_may_register_menu_items() {
    let (context, menu) = context_with_menu();
    context
        .register_menu_item("host", "About", "host.about")
        .unwrap();
    assert_eq!(menu.items().unwrap().len(), 1);
}

#[test]
fn services_are_shared_across_scoped_views() {
    let context = memory_context();
    let writer = context.scoped(PluginCapability::Analytics);
    writer
        .bookmarks()
        .add(Bookmark {
            manga_id: "m-1".to_string(),
            manga_title: "YKK".to_string(),
            chapter_id: "c-1".to_string(),
            chapter_title: None,
            page: 4,
            created_at: 1_700_000_000,
        })
        .unwrap();

    let reader = context.scoped(PluginCapability::Export);
    let bookmarks = reader.bookmarks().all().unwrap();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].manga_id, "m-1");
}

#[test]
fn descriptor_snapshot_starts_empty_and_reflects_updates() {
    let context = memory_context();
    assert!(context.descriptors().is_empty());

    context.update_descriptors(vec![descriptor(
        "tracker",
        PluginCapability::Analytics,
        vec![],
    )]);
    let snapshot = context.descriptors();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, "tracker");

    // The snapshot is visible through scoped views too.
    let scoped = context.scoped(PluginCapability::General);
    assert_eq!(scoped.descriptors().len(), 1);
}

#[test]
fn cache_round_trip_through_context() {
    let context = memory_context();
    let scoped = context.scoped(PluginCapability::ImageProcessing);
    scoped
        .cache()
        .put("cover:m-1", b"imagebytes".to_vec())
        .unwrap();
    assert_eq!(
        scoped.cache().get("cover:m-1").unwrap(),
        Some(b"imagebytes".to_vec())
    );
    assert!(scoped.cache().size_bytes().unwrap() >= 10);
}
