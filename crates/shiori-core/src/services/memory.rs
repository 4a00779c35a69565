//! In-memory host-service implementations.
//!
//! Used by the CLI host and by tests. Each store synchronizes its own
//! state behind a std mutex, matching the contract that mutation goes
//! through the store's API rather than through the shared context.
use std::collections::HashMap;
use std::sync::Mutex;

use crate::kernel::error::Result;
use crate::model::{Bookmark, Chapter, Manga, ReadingProgress, RecentEntry};
use crate::services::{
    BookmarkStore, CacheManager, ContentSource, MenuRegistry, ReadingProgressStore,
    RecentItemsStore,
};

/// Content source backed by a fixed in-memory catalog.
#[derive(Debug, Default)]
pub struct MemoryContentSource {
    catalog: Mutex<Vec<(Manga, Vec<Chapter>)>>,
}

impl MemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, manga: Manga, chapters: Vec<Chapter>) {
        self.catalog.lock().unwrap().push((manga, chapters));
    }
}

impl ContentSource for MemoryContentSource {
    fn search(&self, title: &str) -> Result<Vec<Manga>> {
        let needle = title.to_lowercase();
        Ok(self
            .catalog
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m.title.to_lowercase().contains(&needle))
            .map(|(m, _)| m.clone())
            .collect())
    }

    fn manga(&self, manga_id: &str) -> Result<Option<Manga>> {
        Ok(self
            .catalog
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m.id == manga_id)
            .map(|(m, _)| m.clone()))
    }

    fn chapters(&self, manga_id: &str) -> Result<Vec<Chapter>> {
        Ok(self
            .catalog
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m.id == manga_id)
            .map(|(_, c)| c.clone())
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct MemoryBookmarkStore {
    bookmarks: Mutex<Vec<Bookmark>>,
}

impl MemoryBookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BookmarkStore for MemoryBookmarkStore {
    fn add(&self, bookmark: Bookmark) -> Result<()> {
        let mut bookmarks = self.bookmarks.lock().unwrap();
        bookmarks.retain(|b| !(b.manga_id == bookmark.manga_id && b.chapter_id == bookmark.chapter_id));
        bookmarks.push(bookmark);
        Ok(())
    }

    fn remove(&self, manga_id: &str, chapter_id: &str) -> Result<()> {
        self.bookmarks
            .lock()
            .unwrap()
            .retain(|b| !(b.manga_id == manga_id && b.chapter_id == chapter_id));
        Ok(())
    }

    fn all(&self) -> Result<Vec<Bookmark>> {
        Ok(self.bookmarks.lock().unwrap().clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryReadingProgressStore {
    // Keyed by "manga_id:chapter_id"
    progress: Mutex<HashMap<String, ReadingProgress>>,
}

impl MemoryReadingProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(manga_id: &str, chapter_id: &str) -> String {
        format!("{}:{}", manga_id, chapter_id)
    }
}

impl ReadingProgressStore for MemoryReadingProgressStore {
    fn save_progress(&self, manga_id: &str, chapter_id: &str, page_index: u32) -> Result<()> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.progress.lock().unwrap().insert(
            Self::key(manga_id, chapter_id),
            ReadingProgress {
                manga_id: manga_id.to_string(),
                chapter_id: chapter_id.to_string(),
                page_index,
                last_read_at: now,
            },
        );
        Ok(())
    }

    fn page_index(&self, manga_id: &str, chapter_id: &str) -> Result<Option<u32>> {
        Ok(self
            .progress
            .lock()
            .unwrap()
            .get(&Self::key(manga_id, chapter_id))
            .map(|p| p.page_index))
    }

    fn all(&self) -> Result<Vec<ReadingProgress>> {
        Ok(self.progress.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRecentItemsStore {
    entries: Mutex<Vec<RecentEntry>>,
}

impl MemoryRecentItemsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecentItemsStore for MemoryRecentItemsStore {
    fn touch(&self, entry: RecentEntry) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| e.manga_id != entry.manga_id);
        entries.insert(0, entry);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<RecentEntry>> {
        Ok(self.entries.lock().unwrap().iter().take(limit).cloned().collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCacheManager {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheManager for MemoryCacheManager {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn size_bytes(&self) -> Result<u64> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .map(|v| v.len() as u64)
            .sum())
    }

    fn clear(&self) -> Result<()> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryMenuRegistry {
    items: Mutex<Vec<(String, String, String)>>,
}

impl MemoryMenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MenuRegistry for MemoryMenuRegistry {
    fn register_item(&self, plugin_id: &str, label: &str, action_id: &str) -> Result<()> {
        self.items.lock().unwrap().push((
            plugin_id.to_string(),
            label.to_string(),
            action_id.to_string(),
        ));
        Ok(())
    }

    fn items(&self) -> Result<Vec<(String, String, String)>> {
        Ok(self.items.lock().unwrap().clone())
    }
}
