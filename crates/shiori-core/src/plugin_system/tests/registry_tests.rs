use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex as StdMutex};

use semver::VersionReq;

use super::common::{descriptor, memory_context, sample_chapter, sample_manga, MockBehavior, MockPlugin};
use crate::plugin_system::descriptor::{PluginCapability, PluginDependency};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::registry::{PluginRegistry, PluginState};

fn events() -> Arc<StdMutex<Vec<String>>> {
    Arc::new(StdMutex::new(Vec::new()))
}

#[test]
fn duplicate_registration_keeps_first_instance() {
    let log = events();
    let mut registry = PluginRegistry::new();

    let first = Arc::new(MockPlugin::new("dup", log.clone()));
    let first_calls = first.init_calls.clone();
    registry
        .register_plugin(descriptor("dup", PluginCapability::General, vec![]), first)
        .unwrap();

    let second = Arc::new(MockPlugin::new("dup", log.clone()));
    let result = registry.register_plugin(
        descriptor("dup", PluginCapability::General, vec![]),
        second,
    );
    assert!(matches!(
        result,
        Err(PluginSystemError::RegistrationError { .. })
    ));
    assert_eq!(registry.plugin_count(), 1);

    // The surviving instance is the first one.
    registry.enable_plugin("dup").unwrap();
    registry.initialize_plugin("dup", &memory_context()).unwrap();
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn initialization_respects_dependency_order() {
    let log = events();
    let mut registry = PluginRegistry::new();

    // Registered dependent-first on purpose.
    registry
        .register_plugin(
            descriptor(
                "tracker",
                PluginCapability::Analytics,
                vec![PluginDependency::required_any("stats-core")],
            ),
            Arc::new(MockPlugin::new("tracker", log.clone())),
        )
        .unwrap();
    registry
        .register_plugin(
            descriptor("stats-core", PluginCapability::General, vec![]),
            Arc::new(MockPlugin::new("stats-core", log.clone())),
        )
        .unwrap();

    registry.enable_plugin("tracker").unwrap();
    registry.enable_plugin("stats-core").unwrap();
    let errors = registry.initialize_enabled(&memory_context());
    assert!(errors.is_empty());

    let recorded = log.lock().unwrap().clone();
    assert_eq!(recorded, vec!["init:stats-core", "init:tracker"]);
}

#[test]
fn missing_required_dependency_marks_plugin_failed() {
    let log = events();
    let mut registry = PluginRegistry::new();
    registry
        .register_plugin(
            descriptor(
                "tracker",
                PluginCapability::Analytics,
                vec![PluginDependency::required_any("absent")],
            ),
            Arc::new(MockPlugin::new("tracker", log.clone())),
        )
        .unwrap();
    registry.enable_plugin("tracker").unwrap();

    let errors = registry.initialize_enabled(&memory_context());
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        PluginSystemError::MissingDependency { .. }
    ));
    assert!(matches!(
        registry.plugin_state("tracker"),
        Some(PluginState::MissingDependency(_))
    ));
    // The plugin never got an init call.
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn disabled_required_dependency_blocks_dependent() {
    let log = events();
    let mut registry = PluginRegistry::new();
    registry
        .register_plugin(
            descriptor("stats-core", PluginCapability::General, vec![]),
            Arc::new(MockPlugin::new("stats-core", log.clone())),
        )
        .unwrap();
    registry
        .register_plugin(
            descriptor(
                "tracker",
                PluginCapability::Analytics,
                vec![PluginDependency::required_any("stats-core")],
            ),
            Arc::new(MockPlugin::new("tracker", log.clone())),
        )
        .unwrap();

    // Only the dependent is enabled.
    registry.enable_plugin("tracker").unwrap();
    let errors = registry.initialize_enabled(&memory_context());
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        registry.plugin_state("tracker"),
        Some(PluginState::MissingDependency(_))
    ));
}

#[test]
fn version_incompatible_dependency_blocks_dependent() {
    let log = events();
    let mut registry = PluginRegistry::new();
    registry
        .register_plugin(
            descriptor("stats-core", PluginCapability::General, vec![]),
            Arc::new(MockPlugin::new("stats-core", log.clone())),
        )
        .unwrap();
    registry
        .register_plugin(
            descriptor(
                "tracker",
                PluginCapability::Analytics,
                vec![PluginDependency::required(
                    "stats-core",
                    VersionReq::from_str(">=2.0.0").unwrap(),
                )],
            ),
            Arc::new(MockPlugin::new("tracker", log.clone())),
        )
        .unwrap();

    registry.enable_plugin("stats-core").unwrap();
    registry.enable_plugin("tracker").unwrap();
    let errors = registry.initialize_enabled(&memory_context());
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        registry.plugin_state("tracker"),
        Some(PluginState::MissingDependency(_))
    ));
    // The dependency itself came up fine.
    assert!(matches!(
        registry.plugin_state("stats-core"),
        Some(PluginState::Initialized)
    ));
}

#[test]
fn init_failure_is_sticky_and_isolated() {
    let log = events();
    let mut registry = PluginRegistry::new();
    registry
        .register_plugin(
            descriptor("broken", PluginCapability::General, vec![]),
            Arc::new(MockPlugin::with_behavior(
                "broken",
                MockBehavior::FailInit,
                log.clone(),
            )),
        )
        .unwrap();
    registry
        .register_plugin(
            descriptor("healthy", PluginCapability::General, vec![]),
            Arc::new(MockPlugin::new("healthy", log.clone())),
        )
        .unwrap();

    registry.enable_plugin("broken").unwrap();
    registry.enable_plugin("healthy").unwrap();
    let errors = registry.initialize_enabled(&memory_context());
    assert_eq!(errors.len(), 1);

    assert!(matches!(
        registry.plugin_state("broken"),
        Some(PluginState::InitFailed(_))
    ));
    assert!(matches!(
        registry.plugin_state("healthy"),
        Some(PluginState::Initialized)
    ));
}

#[test]
fn init_panic_is_contained() {
    let log = events();
    let mut registry = PluginRegistry::new();
    registry
        .register_plugin(
            descriptor("explosive", PluginCapability::General, vec![]),
            Arc::new(MockPlugin::with_behavior(
                "explosive",
                MockBehavior::PanicInit,
                log.clone(),
            )),
        )
        .unwrap();
    registry.enable_plugin("explosive").unwrap();

    let result = registry.initialize_plugin("explosive", &memory_context());
    assert!(matches!(
        result,
        Err(PluginSystemError::InitializationError { .. })
    ));
    assert!(matches!(
        registry.plugin_state("explosive"),
        Some(PluginState::InitFailed(_))
    ));
}

#[test]
fn hook_fanout_runs_in_registration_order_and_survives_failures() {
    let log = events();
    let mut registry = PluginRegistry::new();
    for (id, behavior) in [
        ("first", MockBehavior::Ok),
        ("flaky", MockBehavior::FailHooks),
        ("jumpy", MockBehavior::PanicHooks),
        ("last", MockBehavior::Ok),
    ] {
        registry
            .register_plugin(
                descriptor(id, PluginCapability::General, vec![]),
                Arc::new(MockPlugin::with_behavior(id, behavior, log.clone())),
            )
            .unwrap();
        registry.enable_plugin(id).unwrap();
    }
    registry.initialize_enabled(&memory_context());
    log.lock().unwrap().clear();

    let errors = registry.notify_manga_loaded(&sample_manga());
    assert_eq!(errors.len(), 2);
    for error in &errors {
        assert!(matches!(error, PluginSystemError::NotificationError { .. }));
    }

    let recorded = log.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec!["manga:first", "manga:flaky", "manga:jumpy", "manga:last"]
    );
}

#[test]
fn hooks_skip_disabled_and_capability_ineligible_plugins() {
    let log = events();
    let mut registry = PluginRegistry::new();
    for (id, capability) in [
        ("source", PluginCapability::DataSource),
        ("ui", PluginCapability::UiExtension),
        ("filter", PluginCapability::ImageProcessing),
        ("sleeper", PluginCapability::General),
    ] {
        registry
            .register_plugin(
                descriptor(id, capability, vec![]),
                Arc::new(MockPlugin::new(id, log.clone())),
            )
            .unwrap();
        registry.enable_plugin(id).unwrap();
    }
    registry.initialize_enabled(&memory_context());
    registry.disable_plugin("sleeper").unwrap();
    log.lock().unwrap().clear();

    let (chapter, manga) = (sample_chapter(), sample_manga());

    // A pure UI extension only hears about series being opened, and the
    // reading-complete event reaches neither UI nor image plugins.
    registry.notify_chapter_loaded(&chapter, &manga);
    registry.notify_reading_complete(&chapter, &manga);

    let recorded = log.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec!["chapter:source", "chapter:filter", "complete:source"]
    );
}

#[test]
fn notifications_stop_immediately_after_disable() {
    let log = events();
    let mut registry = PluginRegistry::new();
    registry
        .register_plugin(
            descriptor("tracker", PluginCapability::Analytics, vec![]),
            Arc::new(MockPlugin::new("tracker", log.clone())),
        )
        .unwrap();
    registry.enable_plugin("tracker").unwrap();
    registry.initialize_enabled(&memory_context());

    registry.disable_plugin("tracker").unwrap();
    log.lock().unwrap().clear();
    registry.notify_manga_loaded(&sample_manga());
    assert!(log.lock().unwrap().is_empty());

    // Re-enabling resumes delivery without another init.
    registry.enable_plugin("tracker").unwrap();
    registry.notify_manga_loaded(&sample_manga());
    assert_eq!(log.lock().unwrap().clone(), vec!["manga:tracker"]);
}

#[test]
fn shutdown_runs_in_reverse_init_order() {
    let log = events();
    let mut registry = PluginRegistry::new();
    registry
        .register_plugin(
            descriptor("stats-core", PluginCapability::General, vec![]),
            Arc::new(MockPlugin::new("stats-core", log.clone())),
        )
        .unwrap();
    registry
        .register_plugin(
            descriptor(
                "tracker",
                PluginCapability::Analytics,
                vec![PluginDependency::required_any("stats-core")],
            ),
            Arc::new(MockPlugin::new("tracker", log.clone())),
        )
        .unwrap();
    registry.enable_plugin("stats-core").unwrap();
    registry.enable_plugin("tracker").unwrap();
    registry.initialize_enabled(&memory_context());
    log.lock().unwrap().clear();

    let errors = registry.shutdown_all();
    assert!(errors.is_empty());
    assert_eq!(
        log.lock().unwrap().clone(),
        vec!["shutdown:tracker", "shutdown:stats-core"]
    );
}

#[test]
fn present_optional_dependency_initializes_first() {
    let log = events();
    let mut registry = PluginRegistry::new();

    // Registered dependent-first on purpose: the optional dependency
    // still has to come up before its dependent when it is installed.
    registry
        .register_plugin(
            descriptor(
                "tracker",
                PluginCapability::Analytics,
                vec![PluginDependency::optional_any("themes")],
            ),
            Arc::new(MockPlugin::new("tracker", log.clone())),
        )
        .unwrap();
    registry
        .register_plugin(
            descriptor("themes", PluginCapability::UiExtension, vec![]),
            Arc::new(MockPlugin::new("themes", log.clone())),
        )
        .unwrap();

    registry.enable_plugin("tracker").unwrap();
    registry.enable_plugin("themes").unwrap();
    let errors = registry.initialize_enabled(&memory_context());
    assert!(errors.is_empty());

    assert_eq!(
        log.lock().unwrap().clone(),
        vec!["init:themes", "init:tracker"]
    );
}

#[test]
fn optional_dependency_absence_does_not_block() {
    let log = events();
    let mut registry = PluginRegistry::new();
    registry
        .register_plugin(
            descriptor(
                "tracker",
                PluginCapability::Analytics,
                vec![PluginDependency::optional_any("themes")],
            ),
            Arc::new(MockPlugin::new("tracker", log.clone())),
        )
        .unwrap();
    registry.enable_plugin("tracker").unwrap();

    let errors = registry.initialize_enabled(&memory_context());
    assert!(errors.is_empty());
    assert!(matches!(
        registry.plugin_state("tracker"),
        Some(PluginState::Initialized)
    ));
}
