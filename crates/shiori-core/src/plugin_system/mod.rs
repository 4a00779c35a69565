//! # Shiori Plugin System
//!
//! Infrastructure for extending Shiori through dynamically loaded or
//! statically registered plugins: discovery, archive installation,
//! manifest parsing, dependency resolution, the persisted enabled set,
//! lifecycle hook fan-out and shutdown.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`descriptor`]**: Plugin metadata ([`PluginDescriptor`]), the
//!   closed [`PluginCapability`] set and dependency declarations.
//! - **[`error`]**: Error types for every plugin operation
//!   ([`PluginSystemError`](error::PluginSystemError)).
//! - **[`traits`]**: The [`ShioriPlugin`] trait every plugin implements,
//!   plus the dynamic-library entry point contract.
//! - **[`context`]**: The capability object ([`PluginContext`]) handed to
//!   plugins at init, exposing host services.
//! - **[`loader`]**: Package discovery, zip installation with path
//!   traversal rejection, manifest parsing and dynamic loading.
//! - **[`library`]**: The managed directory of shared libraries plugin
//!   code may link against ([`LibraryManager`]).
//! - **[`registry`]**: The in-memory plugin collection
//!   ([`PluginRegistry`]) with states, dependency ordering and hook
//!   dispatch.
//! - **[`state`]**: Atomic persistence of the enabled set
//!   ([`EnabledStore`](state::EnabledStore)).
//! - **[`manager`]**: The central orchestrator ([`PluginManager`]) tying
//!   all of the above together behind one mutation gate.
pub mod context;
pub mod descriptor;
pub mod error;
pub mod library;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod state;
pub mod traits;

pub use context::PluginContext;
pub use descriptor::{
    DescriptorBuilder, HookKind, PluginCapability, PluginDependency, PluginDescriptor,
};
pub use error::PluginSystemError;
pub use library::LibraryManager;
pub use loader::{PluginLoader, PluginPackage};
pub use manager::PluginManager;
pub use registry::{PluginRegistry, PluginState};
pub use traits::ShioriPlugin;

// Test module declaration
#[cfg(test)]
mod tests;
