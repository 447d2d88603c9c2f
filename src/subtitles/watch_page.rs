//! Caption source that scrapes the public watch page through a CORS proxy

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{parse_caption_tracks, CaptionSource};
use crate::captions::CaptionTrack;
use crate::config::SubtitleConfig;

/// Marker preceding the embedded player response JSON on watch pages
const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

/// Search window for the brace matcher, to bound work on hostile pages
const MAX_BLOB_BYTES: usize = 500_000;

/// Fallback source: fetches the watch page HTML via a CORS proxy base and
/// extracts the embedded player response to find caption tracks. The raw
/// caption document is fetched through the same proxy.
pub struct WatchPageSource {
    client: Client,
    proxy_base: String,
}

impl WatchPageSource {
    pub fn new(config: &SubtitleConfig, proxy_base: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, proxy_base }
    }

    fn proxied(&self, url: &str) -> String {
        format!("{}{}", self.proxy_base, urlencoding::encode(url))
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(self.proxied(url)).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("proxy fetch returned {}", response.status()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl CaptionSource for WatchPageSource {
    fn name(&self) -> &str {
        "watch-page"
    }

    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        let html = self.get_text(&watch_url).await?;

        let player_response = extract_json_object(&html, PLAYER_RESPONSE_MARKER)
            .ok_or_else(|| anyhow!("no player response found in watch page"))?;

        let tracks = parse_caption_tracks(&player_response);
        debug!(
            "Watch page via {} listed {} tracks for {}",
            self.proxy_base,
            tracks.len(),
            video_id
        );
        Ok(tracks)
    }

    async fn fetch_document(&self, track: &CaptionTrack) -> Result<String> {
        self.get_text(&track.source_url).await
    }
}

/// Find the first balanced `{...}` object following a marker and parse it.
/// Brace counting is byte-wise; `{` and `}` cannot occur inside multi-byte
/// UTF-8 sequences.
pub(crate) fn extract_json_object(html: &str, marker: &str) -> Option<Value> {
    let marker_idx = html.find(marker)?;
    let rest = &html[marker_idx..];
    let open = rest.find('{')?;
    let blob = &rest[open..];

    let mut depth = 0usize;
    for (i, byte) in blob.bytes().take(MAX_BLOB_BYTES).enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return serde_json::from_str(&blob[..=i]).ok();
                }
            }
            _ => {}
        }
    }

    None
}
