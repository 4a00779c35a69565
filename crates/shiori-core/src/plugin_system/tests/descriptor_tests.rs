use std::str::FromStr;

use semver::VersionReq;

use crate::plugin_system::descriptor::{
    DescriptorBuilder, HookKind, PluginCapability, PluginDependency,
};

#[test]
fn builder_produces_complete_descriptor() {
    let descriptor = DescriptorBuilder::new("tracker", "Reading Tracker", "2.1.0")
        .author("someone")
        .description("Tracks reading habits")
        .license("MIT")
        .website("https://example.org/tracker")
        .capability(PluginCapability::Analytics)
        .dependency(PluginDependency::required_any("stats-core"))
        .build();

    assert_eq!(descriptor.id, "tracker");
    assert_eq!(descriptor.name, "Reading Tracker");
    assert_eq!(descriptor.version, "2.1.0");
    assert_eq!(descriptor.author, "someone");
    assert_eq!(descriptor.license.as_deref(), Some("MIT"));
    assert_eq!(descriptor.capability, PluginCapability::Analytics);
    assert_eq!(descriptor.required_dependency_ids(), vec!["stats-core"]);
}

#[test]
fn required_dependency_ids_skip_optional_deps() {
    let descriptor = DescriptorBuilder::new("a", "A", "1.0.0")
        .dependency(PluginDependency::required_any("b"))
        .dependency(PluginDependency::optional_any("c"))
        .dependency(PluginDependency::required_any("d"))
        .build();

    assert_eq!(descriptor.required_dependency_ids(), vec!["b", "d"]);
}

#[test]
fn dependency_version_compatibility() {
    let dep = PluginDependency::required("base", VersionReq::from_str(">=1.2.0, <2.0.0").unwrap());
    assert!(dep.is_compatible_with("1.2.0"));
    assert!(dep.is_compatible_with("1.9.3"));
    assert!(!dep.is_compatible_with("2.0.0"));
    assert!(!dep.is_compatible_with("1.1.9"));
    assert!(!dep.is_compatible_with("not-a-version"));

    let any = PluginDependency::required_any("base");
    assert!(any.is_compatible_with("0.0.1"));
}

#[test]
fn every_capability_receives_manga_loaded() {
    let capabilities = [
        PluginCapability::DataSource,
        PluginCapability::ImageProcessing,
        PluginCapability::UiExtension,
        PluginCapability::Analytics,
        PluginCapability::Export,
        PluginCapability::Notification,
        PluginCapability::Sync,
        PluginCapability::General,
    ];
    for capability in capabilities {
        assert!(
            capability.allows_hook(HookKind::MangaLoaded),
            "{} should receive manga-loaded",
            capability
        );
    }
}

#[test]
fn hook_eligibility_narrows_for_ui_and_image_plugins() {
    assert!(!PluginCapability::UiExtension.allows_hook(HookKind::ChapterLoaded));
    assert!(!PluginCapability::UiExtension.allows_hook(HookKind::ReadingComplete));
    assert!(PluginCapability::ImageProcessing.allows_hook(HookKind::ChapterLoaded));
    assert!(!PluginCapability::ImageProcessing.allows_hook(HookKind::ReadingComplete));
    assert!(PluginCapability::Analytics.allows_hook(HookKind::ReadingComplete));
}

#[test]
fn menu_registration_is_limited_to_ui_capabilities() {
    assert!(PluginCapability::UiExtension.allows_menu_items());
    assert!(PluginCapability::General.allows_menu_items());
    assert!(!PluginCapability::DataSource.allows_menu_items());
    assert!(!PluginCapability::Analytics.allows_menu_items());
}

#[test]
fn capability_serde_uses_snake_case() {
    let json = serde_json::to_string(&PluginCapability::ImageProcessing).unwrap();
    assert_eq!(json, "\"image_processing\"");

    let parsed: PluginCapability = serde_json::from_str("\"data_source\"").unwrap();
    assert_eq!(parsed, PluginCapability::DataSource);

    assert!(serde_json::from_str::<PluginCapability>("\"sentient_ai\"").is_err());
}
