//! Subtitle acquisition: ordered source fallback with a per-session cache

pub mod innertube;
pub mod watch_page;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::captions::{parse_timed_text, select_track, CaptionTrack, SubtitleUnit, TrackKind};
use crate::config::SubtitleConfig;

pub use innertube::InnertubeSource;
pub use watch_page::WatchPageSource;

/// One strategy for resolving captions for a video id. Each source performs
/// the full pipeline: track metadata, selection, raw document, parsing.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Short label for fallback logging
    fn name(&self) -> &str;

    /// Caption track metadata for the video, empty when none are offered
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>>;

    /// The raw timed-text document behind a track
    async fn fetch_document(&self, track: &CaptionTrack) -> Result<String>;

    /// Resolve sentence-grouped units: metadata, best track, document, parse
    async fn fetch_units(
        &self,
        video_id: &str,
        preferred_languages: &[String],
    ) -> Result<Vec<SubtitleUnit>> {
        let tracks = self.list_tracks(video_id).await?;
        let track = select_track(&tracks, preferred_languages)
            .ok_or_else(|| anyhow!("no caption tracks for {}", video_id))?;
        debug!(
            "Selected track '{}' ({}) via {}",
            track.display_name,
            track.language_code,
            self.name()
        );

        let document = self.fetch_document(track).await?;
        Ok(parse_timed_text(&document))
    }
}

/// Resolves subtitle units for video ids, trying sources in order and
/// caching full results for the life of the process.
pub struct SubtitleService {
    sources: Vec<Box<dyn CaptionSource>>,
    preferred_languages: Vec<String>,
    cache: RwLock<HashMap<String, Vec<SubtitleUnit>>>,
}

impl SubtitleService {
    pub fn new(sources: Vec<Box<dyn CaptionSource>>, preferred_languages: Vec<String>) -> Self {
        Self {
            sources,
            preferred_languages,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Build the default fallback chain: the innertube player API first,
    /// then a watch-page scrape through each configured CORS proxy base.
    pub fn from_config(config: &SubtitleConfig) -> Self {
        let mut sources: Vec<Box<dyn CaptionSource>> = Vec::new();
        sources.push(Box::new(InnertubeSource::new(config)));
        for base in &config.cors_proxy_bases {
            sources.push(Box::new(WatchPageSource::new(config, base.clone())));
        }

        Self::new(sources, config.preferred_languages.clone())
    }

    /// Resolve units for a video id. Repeated calls for the same id return
    /// the cached sequence without network access; the cache never evicts
    /// within a session. All sources failing yields `None` and leaves the
    /// cache unset so a later call can retry.
    pub async fn fetch_units(&self, video_id: &str) -> Option<Vec<SubtitleUnit>> {
        if let Some(units) = self.cache.read().await.get(video_id) {
            debug!("📚 Subtitle cache hit for {}", video_id);
            return Some(units.clone());
        }

        for source in &self.sources {
            match source.fetch_units(video_id, &self.preferred_languages).await {
                Ok(units) if !units.is_empty() => {
                    info!(
                        "✅ Resolved {} subtitle units for {} via {}",
                        units.len(),
                        video_id,
                        source.name()
                    );
                    self.cache
                        .write()
                        .await
                        .insert(video_id.to_string(), units.clone());
                    return Some(units);
                }
                Ok(_) => {
                    debug!("Source {} returned no units for {}", source.name(), video_id);
                }
                Err(e) => {
                    warn!("Source {} failed for {}: {}", source.name(), video_id, e);
                }
            }
        }

        info!("❌ No subtitles resolved for {}", video_id);
        None
    }
}

/// Pull caption track metadata out of a player response document. Shared by
/// the innertube and watch-page sources, which receive the same shape.
pub(crate) fn parse_caption_tracks(player_response: &Value) -> Vec<CaptionTrack> {
    let Some(tracks) = player_response
        .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    tracks
        .iter()
        .filter_map(|t| {
            let language_code = t.get("languageCode")?.as_str()?.to_string();
            let source_url = t.get("baseUrl")?.as_str()?.to_string();
            let display_name = t
                .pointer("/name/simpleText")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let kind = match t.get("kind").and_then(Value::as_str) {
                Some("asr") => TrackKind::Auto,
                _ => TrackKind::Manual,
            };

            Some(CaptionTrack {
                language_code,
                display_name,
                kind,
                source_url,
            })
        })
        .collect()
}
