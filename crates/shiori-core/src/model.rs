//! Shared data model for content flowing between the host and plugins.
//!
//! These types cross the plugin boundary in lifecycle hooks and the
//! host-service traits, so they are plain serde-serializable records.
use serde::{Deserialize, Serialize};

/// A manga series as the host knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manga {
    /// Stable content-source identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Short description, if the source provides one
    #[serde(default)]
    pub description: Option<String>,
    /// Cover image URL, if known
    #[serde(default)]
    pub cover_url: Option<String>,
}

impl Manga {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            cover_url: None,
        }
    }
}

/// A single chapter of a manga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Stable content-source identifier
    pub id: String,
    /// The manga this chapter belongs to
    pub manga_id: String,
    /// Chapter title, if the source provides one
    #[serde(default)]
    pub title: Option<String>,
    /// Chapter number as published (kept as text; "10.5" and "Extra" are valid)
    #[serde(default)]
    pub number: Option<String>,
    /// Number of pages, when known
    #[serde(default)]
    pub page_count: Option<u32>,
}

impl Chapter {
    pub fn new(id: impl Into<String>, manga_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            manga_id: manga_id.into(),
            title: None,
            number: None,
            page_count: None,
        }
    }
}

/// A saved reading position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub manga_id: String,
    pub manga_title: String,
    pub chapter_id: String,
    #[serde(default)]
    pub chapter_title: Option<String>,
    #[serde(default)]
    pub page: u32,
    /// Unix timestamp in milliseconds
    pub created_at: u64,
}

/// Last-read page for a manga/chapter combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingProgress {
    pub manga_id: String,
    pub chapter_id: String,
    #[serde(default)]
    pub page_index: u32,
    /// Unix timestamp in milliseconds
    pub last_read_at: u64,
}

/// An entry in the recently-opened list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub manga_id: String,
    pub manga_title: String,
    /// Unix timestamp in milliseconds
    pub opened_at: u64,
}
