use crate::model::{Chapter, Manga};
use crate::plugin_system::context::PluginContext;
use crate::plugin_system::error::PluginSystemError;

/// Core trait that all plugins implement.
///
/// `init` is called at most once per process, only while the plugin is
/// enabled and after every required dependency has initialized. The
/// lifecycle hooks default to no-ops; a plugin overrides the ones its
/// capability entitles it to receive. Hooks are delivered synchronously on
/// whatever thread drove the triggering event, so implementations must not
/// assume a particular thread and must not block indefinitely.
pub trait ShioriPlugin: Send + Sync {
    /// Stable unique identifier, matching the package manifest
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// The version of the plugin
    fn version(&self) -> &str;

    /// Initialize the plugin with its capability-scoped host context
    fn init(&self, context: &PluginContext) -> Result<(), PluginSystemError>;

    /// A manga was opened in the reader
    fn on_manga_loaded(&self, _manga: &Manga) -> Result<(), PluginSystemError> {
        Ok(())
    }

    /// A chapter finished loading
    fn on_chapter_loaded(&self, _chapter: &Chapter, _manga: &Manga) -> Result<(), PluginSystemError> {
        Ok(())
    }

    /// The reader reached the end of a chapter
    fn on_reading_complete(&self, _chapter: &Chapter, _manga: &Manga) -> Result<(), PluginSystemError> {
        Ok(())
    }

    /// Best-effort teardown on host exit
    fn shutdown(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
}

/// The one exported symbol a dynamic plugin library must provide.
///
/// The function hands ownership of a boxed trait object to the host; the
/// host frees it by reconstructing the `Box`. Nothing else is resolved
/// from the library, keeping the dynamic-loading boundary to this single
/// fixed entry point.
pub type PluginCreateFn = unsafe extern "C" fn() -> *mut dyn ShioriPlugin;

/// Symbol name resolved from a plugin library (null-terminated for
/// `libloading`).
pub const PLUGIN_CREATE_SYMBOL: &[u8] = b"_shiori_plugin_create\0";

/// Export the entry-point symbol for a plugin type.
///
/// ```ignore
/// struct MyPlugin;
/// impl ShioriPlugin for MyPlugin { /* ... */ }
/// shiori_core::declare_plugin!(MyPlugin, MyPlugin::default);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($plugin_type:ty, $constructor:path) => {
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn _shiori_plugin_create() -> *mut dyn $crate::plugin_system::traits::ShioriPlugin {
            let constructor: fn() -> $plugin_type = $constructor;
            Box::into_raw(Box::new(constructor()))
        }
    };
}
