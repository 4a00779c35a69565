/// Application name
pub const APP_NAME: &str = "Shiori";

/// Application version
pub const APP_VERSION: &str = "0.1.0";

/// Configuration directory name
pub const CONFIG_DIR_NAME: &str = ".shiori";

/// Default plugins directory (under the data root)
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Default shared-libraries directory (under the data root)
pub const DEFAULT_LIBRARIES_DIR: &str = "libraries";

/// File name of the persisted plugin enabled-set (under the config root)
pub const ENABLED_STATE_FILE: &str = "enabled_plugins.json";

/// Plugin manifest file name inside each plugin package directory
pub const PLUGIN_MANIFEST_FILE: &str = "manifest.json";

/// Per-hook time budget in milliseconds. Delivery is synchronous; a hook
/// running past this budget is logged, not cancelled.
pub const HOOK_BUDGET_MS: u64 = 5000;
