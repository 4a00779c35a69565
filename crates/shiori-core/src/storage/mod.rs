//! # Shiori Core Storage System
//!
//! Filesystem access for the rest of the core. The [`StorageProvider`]
//! trait abstracts the backing store; [`LocalStorageProvider`] is the
//! local-disk implementation with atomic (write-to-temp-then-rename)
//! file writes.
pub mod error;
pub mod provider;
pub mod local;

/// Re-export key types
pub use error::StorageSystemError;
pub use provider::StorageProvider;
pub use local::LocalStorageProvider;
