use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle hook classes the host fans out to plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    MangaLoaded,
    ChapterLoaded,
    ReadingComplete,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::MangaLoaded => write!(f, "manga_loaded"),
            HookKind::ChapterLoaded => write!(f, "chapter_loaded"),
            HookKind::ReadingComplete => write!(f, "reading_complete"),
        }
    }
}

/// Declared extension-point category of a plugin.
///
/// The capability derives which lifecycle hooks the plugin receives and
/// whether it may contribute UI entries; it is an enforcement boundary,
/// not just a display label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCapability {
    DataSource,
    ImageProcessing,
    UiExtension,
    Analytics,
    Export,
    Notification,
    Sync,
    #[default]
    General,
}

impl PluginCapability {
    /// Whether a plugin with this capability receives the given hook.
    ///
    /// Content-adjacent capabilities receive everything. Image processors
    /// only care about content arriving, and pure UI extensions only about
    /// a series being opened; reading-complete is the analytics/sync class
    /// of event.
    pub fn allows_hook(&self, hook: HookKind) -> bool {
        match self {
            PluginCapability::DataSource
            | PluginCapability::Analytics
            | PluginCapability::Export
            | PluginCapability::Notification
            | PluginCapability::Sync
            | PluginCapability::General => true,
            PluginCapability::ImageProcessing => {
                matches!(hook, HookKind::MangaLoaded | HookKind::ChapterLoaded)
            }
            PluginCapability::UiExtension => matches!(hook, HookKind::MangaLoaded),
        }
    }

    /// Whether a plugin with this capability may register menu entries.
    pub fn allows_menu_items(&self) -> bool {
        matches!(
            self,
            PluginCapability::UiExtension | PluginCapability::General
        )
    }
}

impl fmt::Display for PluginCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginCapability::DataSource => write!(f, "data_source"),
            PluginCapability::ImageProcessing => write!(f, "image_processing"),
            PluginCapability::UiExtension => write!(f, "ui_extension"),
            PluginCapability::Analytics => write!(f, "analytics"),
            PluginCapability::Export => write!(f, "export"),
            PluginCapability::Notification => write!(f, "notification"),
            PluginCapability::Sync => write!(f, "sync"),
            PluginCapability::General => write!(f, "general"),
        }
    }
}

/// Represents a dependency on another plugin
#[derive(Debug, Clone, Serialize)]
pub struct PluginDependency {
    /// The id of the required plugin
    pub plugin_id: String,

    /// The version range that is acceptable, when constrained
    pub version_range: Option<semver::VersionReq>,

    /// Whether this is a hard requirement or optional dependency
    pub required: bool,
}

impl PluginDependency {
    /// Create a new required dependency with any version
    pub fn required_any(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            version_range: None,
            required: true,
        }
    }

    /// Create a new required dependency with a specific version range
    pub fn required(plugin_id: &str, version_range: semver::VersionReq) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            version_range: Some(version_range),
            required: true,
        }
    }

    /// Create a new optional dependency with any version
    pub fn optional_any(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            version_range: None,
            required: false,
        }
    }

    /// Check if this dependency is satisfied by the given version string
    pub fn is_compatible_with(&self, version_str: &str) -> bool {
        match &self.version_range {
            Some(range) => match semver::Version::parse(version_str) {
                Ok(v) => range.matches(&v),
                Err(_) => {
                    log::warn!(
                        "Could not parse version string '{}' for compatibility check with plugin '{}'",
                        version_str,
                        self.plugin_id
                    );
                    false
                }
            },
            // No version range means any version is acceptable
            None => true,
        }
    }
}

impl fmt::Display for PluginDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requirement_type = if self.required { "Requires" } else { "Optional" };
        match &self.version_range {
            Some(range) => write!(
                f,
                "{} plugin: {} (version: {})",
                requirement_type, self.plugin_id, range
            ),
            None => write!(f, "{} plugin: {} (any version)", requirement_type, self.plugin_id),
        }
    }
}

/// Immutable metadata record describing one plugin package.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    /// Unique identifier for the plugin
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Plugin version (display string; not an ordering)
    pub version: String,

    /// Plugin author
    pub author: String,

    /// Plugin description
    pub description: String,

    /// License information
    pub license: Option<String>,

    /// Plugin website URL (optional)
    pub website: Option<String>,

    /// Declared extension-point category
    pub capability: PluginCapability,

    /// Other plugins required to be present and enabled before this one
    pub dependencies: Vec<PluginDependency>,
}

impl PluginDescriptor {
    /// Create a new descriptor with the mandatory fields
    pub fn new(id: &str, name: &str, version: &str, author: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            author: author.to_string(),
            description: description.to_string(),
            license: None,
            website: None,
            capability: PluginCapability::General,
            dependencies: Vec::new(),
        }
    }

    /// Ids of the required dependencies, in declaration order
    pub fn required_dependency_ids(&self) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter(|d| d.required)
            .map(|d| d.plugin_id.as_str())
            .collect()
    }
}

/// Builder for creating a plugin descriptor
pub struct DescriptorBuilder {
    descriptor: PluginDescriptor,
}

impl DescriptorBuilder {
    /// Create a new descriptor builder
    pub fn new(id: &str, name: &str, version: &str) -> Self {
        Self {
            descriptor: PluginDescriptor::new(id, name, version, "Unknown", ""),
        }
    }

    /// Set the plugin author
    pub fn author(mut self, author: &str) -> Self {
        self.descriptor.author = author.to_string();
        self
    }

    /// Set the plugin description
    pub fn description(mut self, description: &str) -> Self {
        self.descriptor.description = description.to_string();
        self
    }

    /// Set the plugin license
    pub fn license(mut self, license: &str) -> Self {
        self.descriptor.license = Some(license.to_string());
        self
    }

    /// Set the plugin website
    pub fn website(mut self, website: &str) -> Self {
        self.descriptor.website = Some(website.to_string());
        self
    }

    /// Set the declared capability
    pub fn capability(mut self, capability: PluginCapability) -> Self {
        self.descriptor.capability = capability;
        self
    }

    /// Add a dependency
    pub fn dependency(mut self, dependency: PluginDependency) -> Self {
        self.descriptor.dependencies.push(dependency);
        self
    }

    /// Build the descriptor
    pub fn build(self) -> PluginDescriptor {
        self.descriptor
    }
}
