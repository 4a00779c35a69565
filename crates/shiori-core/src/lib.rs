//! Core library for Shiori, a manga reader with a plugin runtime.
//!
//! The [`plugin_system`] module is the heart of the crate: it discovers
//! plugin packages on disk, installs archives safely, resolves
//! dependencies, persists which plugins the user enabled and fans reading
//! lifecycle events out to them. [`services`] defines the host-side
//! capability traits plugins consume through their context, [`storage`]
//! the filesystem abstraction everything persists through, and [`model`]
//! the reading-domain data types hooks carry.
pub mod kernel;
pub mod model;
pub mod plugin_system;
pub mod services;
pub mod storage;

// Re-export key public types for the binary and for plugins.
pub use kernel::error::{Error, Result};
pub use plugin_system::{
    PluginCapability, PluginContext, PluginDescriptor, PluginManager, ShioriPlugin,
};
pub use storage::provider::StorageProvider;
