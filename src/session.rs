//! Session controller
//!
//! One session owns everything the original browser app kept in module-level
//! globals: the active video, loaded subtitle units, loop state and the
//! bookmark library. All mutation happens on the single host execution
//! context; ordering guarantees (a deleted bookmark clears a loop it drives
//! before the next tick can observe it) follow from that.

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

use crate::captions::SubtitleUnit;
use crate::config::Config;
use crate::library::{
    active_unit_index, linked_bookmark, Bookmark, Library, StateStore, VideoEntry,
    LIBRARY_STATE_KEY,
};
use crate::playback::{LoopController, LoopError, LoopToggle};
use crate::player::{PlayerEvent, PlayerHandle};
use crate::subtitles::SubtitleService;

/// Result of toggling a subtitle line as a bookmark
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleBookmarkToggle {
    Added(String),
    Removed(String),
}

/// What a periodic tick changed, for the host to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// Loop enforcement seeked back to point A this tick
    pub looped: bool,
    /// The highlighted subtitle index changed since the previous tick
    pub active_changed: bool,
    /// Current highlighted subtitle index, if any unit has started
    pub active_index: Option<usize>,
}

pub struct Session<S: StateStore> {
    config: Config,
    store: S,
    service: SubtitleService,
    library: Library,
    current_video: Option<String>,
    subtitles: Option<Vec<SubtitleUnit>>,
    last_active_index: Option<usize>,
    loop_ctl: LoopController,
    /// Id of the bookmark driving the active loop, when entered via the
    /// bookmark review path
    loop_bookmark_id: Option<String>,
}

impl<S: StateStore> Session<S> {
    pub fn new(config: Config, store: S) -> Self {
        let service = SubtitleService::from_config(&config.subtitles);
        Self::with_service(config, store, service)
    }

    /// Construct with an explicit subtitle service (tests inject fakes here)
    pub fn with_service(config: Config, store: S, service: SubtitleService) -> Self {
        Self {
            config,
            store,
            service,
            library: Library::default(),
            current_video: None,
            subtitles: None,
            last_active_index: None,
            loop_ctl: LoopController::new(),
            loop_bookmark_id: None,
        }
    }

    /// Restore the persisted library. A missing or malformed document is an
    /// empty library, never an error.
    pub async fn restore(&mut self) {
        match self.store.get(LIBRARY_STATE_KEY).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(library) => {
                    self.library = library;
                    info!(
                        "📚 Restored library with {} videos",
                        self.library.videos.len()
                    );
                }
                Err(e) => {
                    warn!("Persisted library is malformed, starting empty: {}", e);
                    self.library = Library::default();
                }
            },
            Ok(None) => {}
            Err(e) => warn!("Failed to read persisted library: {}", e),
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn current_video_id(&self) -> Option<&str> {
        self.current_video.as_deref()
    }

    pub fn current_entry(&self) -> Option<&VideoEntry> {
        self.current_video
            .as_deref()
            .and_then(|id| self.library.entry(id))
    }

    pub fn subtitles(&self) -> Option<&[SubtitleUnit]> {
        self.subtitles.as_deref()
    }

    pub fn is_looping(&self) -> bool {
        self.loop_ctl.is_looping()
    }

    // ===== Video lifecycle =====

    /// Switch the session to a video: reset loop and subtitle state, record
    /// the video in the library (new entries go to the front), point the
    /// widget at it and resolve subtitles. Subtitles resolved for an id that
    /// is no longer current by the time they arrive are discarded.
    pub async fn load_video(&mut self, player: &mut dyn PlayerHandle, video_id: &str) -> Result<()> {
        if !crate::video_id::is_valid_video_id(video_id) {
            return Err(anyhow!("invalid video id: {video_id}"));
        }

        self.clear_loop();
        self.subtitles = None;
        self.last_active_index = None;
        self.current_video = Some(video_id.to_string());

        let (_, created) = self.library.lookup_or_create(video_id);
        if created {
            info!("🎬 Added {} to library", video_id);
            self.persist().await;
        }

        player.load(video_id);

        let units = self.service.fetch_units(video_id).await;
        self.install_subtitles(video_id, units);
        Ok(())
    }

    /// Accept a resolved subtitle sequence if the video is still current.
    /// The request-identity check drops responses that raced a video switch.
    pub fn install_subtitles(&mut self, video_id: &str, units: Option<Vec<SubtitleUnit>>) {
        if self.current_video.as_deref() != Some(video_id) {
            debug!("Discarding stale subtitle response for {}", video_id);
            return;
        }
        self.subtitles = units;
        self.last_active_index = None;
    }

    /// Fill in the title the first time the widget reports one
    pub async fn set_video_title(&mut self, title: &str) {
        let Some(id) = self.current_video.clone() else {
            return;
        };
        if title.is_empty() {
            return;
        }
        if let Some(entry) = self.library.entry_mut(&id) {
            if entry.title.is_empty() {
                entry.title = title.to_string();
                self.persist().await;
            }
        }
    }

    /// Remove a video and its bookmarks from the library. Removing the
    /// current video also resets playback-dependent state.
    pub async fn remove_video(&mut self, video_id: &str) -> bool {
        let removed = self.library.remove_video(video_id);
        if removed {
            if self.current_video.as_deref() == Some(video_id) {
                self.current_video = None;
                self.subtitles = None;
                self.last_active_index = None;
                self.clear_loop();
            }
            self.persist().await;
        }
        removed
    }

    // ===== Playback ticks =====

    /// Periodic host tick: enforce the loop against the live position, then
    /// recompute the highlighted subtitle. Visible update work is only
    /// signalled when the highlighted index actually changed.
    pub fn handle_tick(&mut self, player: &mut dyn PlayerHandle) -> TickOutcome {
        let mut position = player.current_time();

        let looped = match self.loop_ctl.check(position) {
            Some(target) => {
                player.seek_to(target);
                position = target;
                true
            }
            None => false,
        };

        let active_index = self
            .subtitles
            .as_deref()
            .and_then(|units| active_unit_index(units, position));
        let active_changed = active_index != self.last_active_index;
        self.last_active_index = active_index;

        TickOutcome {
            looped,
            active_changed,
            active_index,
        }
    }

    /// Widget event dispatch
    pub async fn handle_event(&mut self, player: &mut dyn PlayerHandle, event: PlayerEvent) {
        match event {
            PlayerEvent::Ready { title } => {
                if let Some(title) = title {
                    self.set_video_title(&title).await;
                }
            }
            PlayerEvent::StateChange(_) => {}
            PlayerEvent::Tick { .. } => {
                self.handle_tick(player);
            }
        }
    }

    // ===== Loop control =====

    /// Advance the A/B toggle cycle at the current playback position
    pub fn toggle_loop(&mut self, player: &dyn PlayerHandle) -> Result<LoopToggle, LoopError> {
        let outcome = self.loop_ctl.toggle(player.current_time())?;
        // Any manual toggle detaches the loop from a bookmark
        self.loop_bookmark_id = None;
        Ok(outcome)
    }

    pub fn clear_loop(&mut self) {
        self.loop_ctl.clear();
        self.loop_bookmark_id = None;
    }

    /// Loop a bookmark's span immediately, bypassing the two-step toggle.
    /// Bookmarks without a stored duration use the configured review span.
    pub fn loop_bookmark(&mut self, bookmark_id: &str) -> Result<()> {
        let entry = self
            .current_entry()
            .ok_or_else(|| anyhow!("no video loaded"))?;
        let bookmark = entry
            .bookmark(bookmark_id)
            .ok_or_else(|| anyhow!("unknown bookmark: {bookmark_id}"))?;

        let span = bookmark
            .duration_seconds
            .unwrap_or(self.config.playback.default_loop_secs);
        self.loop_ctl.loop_span(bookmark.time_seconds, span);
        self.loop_bookmark_id = Some(bookmark_id.to_string());
        Ok(())
    }

    // ===== Bookmarks =====

    /// Add a manual bookmark at a whole-second position
    pub async fn add_bookmark(&mut self, time_seconds: f64, note: String) -> Result<String> {
        let entry = self.current_entry_mut()?;
        let id = entry.add_bookmark(Bookmark::new(time_seconds.floor(), None, note));
        self.persist().await;
        Ok(id)
    }

    /// Delete a bookmark. A loop driven by it is cleared synchronously,
    /// before the next tick can observe the dangling span.
    pub async fn delete_bookmark(&mut self, bookmark_id: &str) -> Result<bool> {
        if self.loop_bookmark_id.as_deref() == Some(bookmark_id) {
            self.clear_loop();
        }

        let entry = self.current_entry_mut()?;
        let removed = entry.delete_bookmark(bookmark_id).is_some();
        if removed {
            self.persist().await;
        }
        Ok(removed)
    }

    pub async fn update_bookmark_note(&mut self, bookmark_id: &str, note: String) -> Result<bool> {
        let entry = self.current_entry_mut()?;
        let updated = entry.update_note(bookmark_id, note);
        if updated {
            self.persist().await;
        }
        Ok(updated)
    }

    /// Whether the subtitle unit at an index has a proximity-linked bookmark
    pub fn is_unit_bookmarked(&self, index: usize) -> bool {
        let Some(unit) = self.subtitles.as_deref().and_then(|u| u.get(index)) else {
            return false;
        };
        self.current_entry()
            .map(|entry| linked_bookmark(&entry.bookmarks, unit).is_some())
            .unwrap_or(false)
    }

    /// Toggle the subtitle line at an index as a bookmark: remove the linked
    /// bookmark if one exists, otherwise create one carrying the unit's
    /// unfloored start, its duration and its text as the note.
    pub async fn toggle_subtitle_bookmark(
        &mut self,
        index: usize,
    ) -> Result<SubtitleBookmarkToggle> {
        let unit = self
            .subtitles
            .as_deref()
            .and_then(|u| u.get(index))
            .cloned()
            .ok_or_else(|| anyhow!("no subtitle unit at index {index}"))?;

        let existing = self
            .current_entry()
            .and_then(|entry| linked_bookmark(&entry.bookmarks, &unit))
            .map(|b| b.id.clone());

        let outcome = match existing {
            Some(id) => {
                self.delete_bookmark(&id).await?;
                SubtitleBookmarkToggle::Removed(id)
            }
            None => {
                let entry = self.current_entry_mut()?;
                let id = entry.add_bookmark(Bookmark::new(
                    unit.start_seconds,
                    Some(unit.duration_seconds),
                    unit.text.clone(),
                ));
                self.persist().await;
                SubtitleBookmarkToggle::Added(id)
            }
        };
        Ok(outcome)
    }

    fn current_entry_mut(&mut self) -> Result<&mut VideoEntry> {
        let id = self
            .current_video
            .clone()
            .ok_or_else(|| anyhow!("no video loaded"))?;
        self.library
            .entry_mut(&id)
            .ok_or_else(|| anyhow!("library entry missing for {id}"))
    }

    /// Persist the whole library. Write failures are logged best-effort;
    /// in-memory state stays authoritative for the session.
    async fn persist(&self) {
        let value = match serde_json::to_value(&self.library) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to serialize library: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(LIBRARY_STATE_KEY, value).await {
            warn!("Failed to persist library: {}", e);
        }
    }
}
