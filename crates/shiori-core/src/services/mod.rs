//! # Host Service Boundaries
//!
//! Traits for the host services a plugin may reach through its
//! [`PluginContext`](crate::plugin_system::context::PluginContext). The
//! runtime treats these as external collaborators: it defines only the
//! boundary, never the behavior behind it. The host wires real
//! implementations (remote client, on-disk stores); tests and the CLI use
//! the in-memory implementations from [`memory`].
//!
//! All mutation goes through these traits' own synchronized APIs; the
//! context shares the trait objects read-only.
pub mod memory;

use std::fmt::Debug;

use crate::kernel::error::Result;
use crate::model::{Bookmark, Chapter, Manga, ReadingProgress, RecentEntry};

/// Read access to the remote content source.
pub trait ContentSource: Send + Sync + Debug {
    /// Search the source for series matching a title.
    fn search(&self, title: &str) -> Result<Vec<Manga>>;

    /// Fetch a single series by id.
    fn manga(&self, manga_id: &str) -> Result<Option<Manga>>;

    /// List the chapters of a series.
    fn chapters(&self, manga_id: &str) -> Result<Vec<Chapter>>;
}

/// Persistent bookmark storage.
pub trait BookmarkStore: Send + Sync + Debug {
    fn add(&self, bookmark: Bookmark) -> Result<()>;
    fn remove(&self, manga_id: &str, chapter_id: &str) -> Result<()>;
    fn all(&self) -> Result<Vec<Bookmark>>;
}

/// Persistent per-chapter reading progress.
pub trait ReadingProgressStore: Send + Sync + Debug {
    fn save_progress(&self, manga_id: &str, chapter_id: &str, page_index: u32) -> Result<()>;
    fn page_index(&self, manga_id: &str, chapter_id: &str) -> Result<Option<u32>>;
    fn all(&self) -> Result<Vec<ReadingProgress>>;
}

/// Recently-opened series list.
pub trait RecentItemsStore: Send + Sync + Debug {
    fn touch(&self, entry: RecentEntry) -> Result<()>;
    fn recent(&self, limit: usize) -> Result<Vec<RecentEntry>>;
}

/// Cache of downloaded assets (pages, covers).
pub trait CacheManager: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
    /// Approximate total size of cached data in bytes.
    fn size_bytes(&self) -> Result<u64>;
    fn clear(&self) -> Result<()>;
}

/// Registration point for plugin-contributed menu entries.
///
/// The windowed UI consumes registered items; the runtime only records
/// them.
pub trait MenuRegistry: Send + Sync + Debug {
    /// Register a menu entry under the plugins menu. `action_id` is the
    /// identifier the host dispatches back to the owning plugin.
    fn register_item(&self, plugin_id: &str, label: &str, action_id: &str) -> Result<()>;

    /// Items registered so far as `(plugin_id, label, action_id)` tuples.
    fn items(&self) -> Result<Vec<(String, String, String)>>;
}
