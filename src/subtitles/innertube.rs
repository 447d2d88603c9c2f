//! Caption source backed by the platform's internal player API

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{parse_caption_tracks, CaptionSource};
use crate::captions::CaptionTrack;
use crate::config::SubtitleConfig;

/// Resolves caption tracks through the innertube `player` endpoint. The
/// ANDROID client context returns caption metadata without extra auth.
pub struct InnertubeSource {
    client: Client,
    endpoint: String,
}

impl InnertubeSource {
    pub fn new(config: &SubtitleConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            endpoint: config.innertube_endpoint.clone(),
        }
    }

    fn player_body(video_id: &str) -> serde_json::Value {
        json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "19.09.37",
                    "androidSdkVersion": 30,
                    "hl": "ja",
                    "gl": "JP",
                },
            },
            "videoId": video_id,
        })
    }
}

#[async_trait]
impl CaptionSource for InnertubeSource {
    fn name(&self) -> &str {
        "innertube"
    }

    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&Self::player_body(video_id))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("innertube API returned {}", response.status()));
        }

        let player_response: serde_json::Value = response.json().await?;
        let tracks = parse_caption_tracks(&player_response);
        debug!("Innertube listed {} tracks for {}", tracks.len(), video_id);
        Ok(tracks)
    }

    async fn fetch_document(&self, track: &CaptionTrack) -> Result<String> {
        let response = self.client.get(&track.source_url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "caption document fetch returned {}",
                response.status()
            ));
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_body_shape() {
        let body = InnertubeSource::player_body("dQw4w9WgXcQ");
        assert_eq!(body["videoId"], "dQw4w9WgXcQ");
        assert_eq!(body["context"]["client"]["clientName"], "ANDROID");
        assert_eq!(body["context"]["client"]["hl"], "ja");
    }
}
