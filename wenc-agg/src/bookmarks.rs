//! Session-scoped bookmark list
//!
//! Ordered by insertion and deduplicated by title. Nothing is persisted;
//! `export_json` hands the list to whoever wants to keep it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use wenc_common::{Error, Result};

use crate::types::TopicRecord;

/// A bookmarked topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub title: String,
    pub knowledge_graph_id: Option<String>,
    #[serde(serialize_with = "rfc3339")]
    pub bookmarked_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn from_record(record: &TopicRecord, at: DateTime<Utc>) -> Self {
        Self {
            title: record.entity.display_title().to_string(),
            knowledge_graph_id: record.entity.knowledge_graph_id().map(str::to_string),
            bookmarked_at: at,
        }
    }
}

fn rfc3339<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmarkList {
    items: Vec<Bookmark>,
}

impl BookmarkList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bookmark`; returns false if its title is already bookmarked
    pub fn add(&mut self, bookmark: Bookmark) -> bool {
        if self.contains(&bookmark.title) {
            return false;
        }
        self.items.push(bookmark);
        true
    }

    /// Remove the bookmark titled `title`; returns whether one was removed
    pub fn remove(&mut self, title: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|b| b.title != title);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn contains(&self, title: &str) -> bool {
        self.items.iter().any(|b| b.title == title)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Bookmark] {
        &self.items
    }

    /// Flat JSON array of `{title, knowledge_graph_id, bookmarked_at}`
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.items)
            .map_err(|e| Error::Internal(format!("Failed to serialize bookmarks: {}", e)))
    }
}
