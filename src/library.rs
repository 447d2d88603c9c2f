//! Bookmark library: video entries, bookmarks, persistence and
//! bookmark-subtitle linkage

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::captions::SubtitleUnit;

/// Storage key for the persisted library, kept from the original app
pub const LIBRARY_STATE_KEY: &str = "langclip_data";

/// Proximity window linking a bookmark to a subtitle unit, in seconds
const LINK_WINDOW_SECS: f64 = 1.0;

/// A user- or subtitle-derived marker at a point in a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Opaque unique id
    pub id: String,

    pub time_seconds: f64,

    /// Span of the marked passage; unset for plain point bookmarks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    pub note: String,

    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(time_seconds: f64, duration_seconds: Option<f64>, note: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            time_seconds,
            duration_seconds,
            note,
            created_at: Utc::now(),
        }
    }
}

/// One video the user has loaded, with its bookmarks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub video_id: String,

    /// Populated lazily once the widget reports it
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,

    pub added_at: DateTime<Utc>,
}

impl VideoEntry {
    pub fn new(video_id: String) -> Self {
        Self {
            video_id,
            title: String::new(),
            bookmarks: Vec::new(),
            added_at: Utc::now(),
        }
    }

    /// Insert a bookmark, keeping the list sorted by time
    pub fn add_bookmark(&mut self, bookmark: Bookmark) -> String {
        let id = bookmark.id.clone();
        self.bookmarks.push(bookmark);
        self.sort_bookmarks();
        id
    }

    /// Remove a bookmark by id, returning it when present
    pub fn delete_bookmark(&mut self, bookmark_id: &str) -> Option<Bookmark> {
        let idx = self.bookmarks.iter().position(|b| b.id == bookmark_id)?;
        Some(self.bookmarks.remove(idx))
    }

    /// Edit a bookmark's note in place
    pub fn update_note(&mut self, bookmark_id: &str, note: String) -> bool {
        match self.bookmarks.iter_mut().find(|b| b.id == bookmark_id) {
            Some(bookmark) => {
                bookmark.note = note;
                true
            }
            None => false,
        }
    }

    pub fn bookmark(&self, bookmark_id: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == bookmark_id)
    }

    fn sort_bookmarks(&mut self) {
        self.bookmarks.sort_by(|a, b| {
            a.time_seconds
                .partial_cmp(&b.time_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

/// The persisted set of videos, most-recently-added first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub videos: Vec<VideoEntry>,
}

impl Library {
    pub fn entry(&self, video_id: &str) -> Option<&VideoEntry> {
        self.videos.iter().find(|v| v.video_id == video_id)
    }

    pub fn entry_mut(&mut self, video_id: &str) -> Option<&mut VideoEntry> {
        self.videos.iter_mut().find(|v| v.video_id == video_id)
    }

    /// Find the entry for a video id, creating one at the front of the list
    /// when it is new. Reloading an existing entry does not reorder.
    /// Returns whether a new entry was created.
    pub fn lookup_or_create(&mut self, video_id: &str) -> (&mut VideoEntry, bool) {
        if let Some(idx) = self.videos.iter().position(|v| v.video_id == video_id) {
            return (&mut self.videos[idx], false);
        }

        self.videos.insert(0, VideoEntry::new(video_id.to_string()));
        (&mut self.videos[0], true)
    }

    /// Drop a video and its bookmarks
    pub fn remove_video(&mut self, video_id: &str) -> bool {
        let before = self.videos.len();
        self.videos.retain(|v| v.video_id != video_id);
        self.videos.len() != before
    }
}

// ===== Bookmark-subtitle linkage =====

/// A unit is bookmarked when some bookmark's time differs from the unit's
/// floored start by less than one second. Proximity, not exact match.
pub fn linked_bookmark<'a>(bookmarks: &'a [Bookmark], unit: &SubtitleUnit) -> Option<&'a Bookmark> {
    let anchor = unit.start_seconds.floor();
    bookmarks
        .iter()
        .find(|b| (b.time_seconds - anchor).abs() < LINK_WINDOW_SECS)
}

pub fn is_unit_bookmarked(bookmarks: &[Bookmark], unit: &SubtitleUnit) -> bool {
    linked_bookmark(bookmarks, unit).is_some()
}

/// Greatest index whose start is at or before the playback position,
/// scanning from the end. `None` before the first unit begins.
pub fn active_unit_index(units: &[SubtitleUnit], position: f64) -> Option<usize> {
    units
        .iter()
        .rposition(|unit| position >= unit.start_seconds)
}

// ===== Persistence =====

/// Key-value persistence seam: local, optionally mirrored to a cloud sync
/// layer by the host. JSON in, JSON out.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

// Hosts may share one store between a session and a sync layer
#[async_trait]
impl<S: StateStore + ?Sized> StateStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        (**self).set(key, value).await
    }
}

/// File-backed store: each key is a JSON document inside one state file
/// directory
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let path = self.key_path(key);
        if !path.exists() {
            debug!("State miss: no file for key {}", key);
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path).await?;
        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Failed to parse state file {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.key_path(key);
        let content = serde_json::to_string_pretty(&value)?;
        tokio::fs::write(&path, content).await?;
        info!("💾 Persisted state key {} to {}", key, path.display());
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(start: f64, duration: f64, text: &str) -> SubtitleUnit {
        SubtitleUnit {
            start_seconds: start,
            duration_seconds: duration,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_bookmarks_stay_sorted() {
        let mut entry = VideoEntry::new("dQw4w9WgXcQ".to_string());
        entry.add_bookmark(Bookmark::new(30.0, None, "third".to_string()));
        entry.add_bookmark(Bookmark::new(5.0, None, "first".to_string()));
        entry.add_bookmark(Bookmark::new(12.0, None, "second".to_string()));

        let times: Vec<f64> = entry.bookmarks.iter().map(|b| b.time_seconds).collect();
        assert_eq!(times, vec![5.0, 12.0, 30.0]);
    }

    #[test]
    fn test_note_edit_in_place() {
        let mut entry = VideoEntry::new("dQw4w9WgXcQ".to_string());
        let id = entry.add_bookmark(Bookmark::new(5.0, None, "old".to_string()));

        assert!(entry.update_note(&id, "new".to_string()));
        assert_eq!(entry.bookmark(&id).unwrap().note, "new");
        assert!(!entry.update_note("missing", "x".to_string()));
    }

    #[test]
    fn test_lookup_or_create_front_insertion() {
        let mut library = Library::default();
        library.lookup_or_create("aaaaaaaaaaa");
        library.lookup_or_create("bbbbbbbbbbb");

        // Newest first
        assert_eq!(library.videos[0].video_id, "bbbbbbbbbbb");
        assert_eq!(library.videos[1].video_id, "aaaaaaaaaaa");

        // Reload of an existing id does not reorder
        let (_, created) = library.lookup_or_create("aaaaaaaaaaa");
        assert!(!created);
        assert_eq!(library.videos[0].video_id, "bbbbbbbbbbb");
        assert_eq!(library.videos.len(), 2);
    }

    #[test]
    fn test_proximity_linkage() {
        let bookmarks = vec![
            Bookmark::new(10.0, None, "near".to_string()),
            Bookmark::new(8.0, None, "far".to_string()),
        ];

        // start 10.6 floors to 10: diff 0.6 < 1 links the bookmark at 10
        let near = unit(10.6, 2.0, "text");
        assert_eq!(linked_bookmark(&bookmarks, &near).unwrap().note, "near");

        // the bookmark at 8 is 2.6 away, not linked
        let lone = unit(3.0, 2.0, "text");
        assert!(!is_unit_bookmarked(&bookmarks, &lone));
    }

    #[test]
    fn test_active_unit_selection() {
        let units = vec![
            unit(0.0, 2.0, "a"),
            unit(2.0, 2.0, "b"),
            unit(10.0, 2.0, "c"),
        ];

        assert_eq!(active_unit_index(&units, 0.0), Some(0));
        assert_eq!(active_unit_index(&units, 3.5), Some(1));
        // Past the last unit's start, even beyond its end
        assert_eq!(active_unit_index(&units, 50.0), Some(2));
        // Before the first unit begins
        assert_eq!(active_unit_index(&[unit(5.0, 1.0, "x")], 2.0), None);
        assert_eq!(active_unit_index(&[], 2.0), None);
    }

    #[test]
    fn test_library_round_trip() {
        let mut library = Library::default();
        for id in ["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"] {
            let (entry, _) = library.lookup_or_create(id);
            entry.title = format!("title {id}");
            entry.add_bookmark(Bookmark::new(1.5, Some(3.0), format!("note {id}")));
            entry.add_bookmark(Bookmark::new(0.5, None, "earlier".to_string()));
        }

        let json = serde_json::to_value(&library).unwrap();
        assert!(json["videos"][0]["videoId"].is_string());
        assert!(json["videos"][0]["bookmarks"][0]["timeSeconds"].is_number());

        let reloaded: Library = serde_json::from_value(json).unwrap();
        assert_eq!(reloaded, library);
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get(LIBRARY_STATE_KEY).await.unwrap().is_none());

        let mut library = Library::default();
        library.lookup_or_create("dQw4w9WgXcQ");
        store
            .set(LIBRARY_STATE_KEY, serde_json::to_value(&library).unwrap())
            .await
            .unwrap();

        let loaded = store.get(LIBRARY_STATE_KEY).await.unwrap().unwrap();
        let reloaded: Library = serde_json::from_value(loaded).unwrap();
        assert_eq!(reloaded, library);
    }
}
