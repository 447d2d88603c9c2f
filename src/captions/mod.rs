//! Caption data model, timed-text parsing and track selection

pub mod parser;
pub mod selector;

use serde::{Deserialize, Serialize};

pub use parser::parse_timed_text;
pub use selector::select_track;

/// Origin of a caption track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Uploaded by the channel
    Manual,
    /// Auto-generated speech recognition ("asr")
    Auto,
}

impl Default for TrackKind {
    fn default() -> Self {
        TrackKind::Manual
    }
}

/// One language/kind variant of timed captions offered for a video
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    /// BCP-47 style language code ("ja", "en", ...)
    pub language_code: String,

    /// Human-readable track name
    #[serde(rename = "name")]
    pub display_name: String,

    /// Manual vs auto-generated
    #[serde(default)]
    pub kind: TrackKind,

    /// URL of the raw timed-text document
    #[serde(skip_serializing, default)]
    pub source_url: String,
}

/// One raw timed-text element, prior to sentence grouping
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragment {
    pub start_seconds: f64,
    pub duration_seconds: f64,
    pub text: String,
}

/// A sentence-grouped, display-ready caption entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleUnit {
    #[serde(rename = "start")]
    pub start_seconds: f64,

    #[serde(rename = "duration")]
    pub duration_seconds: f64,

    pub text: String,
}

impl SubtitleUnit {
    /// End of the span this unit covers
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle_unit_serde_shape() {
        let unit = SubtitleUnit {
            start_seconds: 1.5,
            duration_seconds: 2.0,
            text: "Hello.".to_string(),
        };

        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["start"], 1.5);
        assert_eq!(json["duration"], 2.0);
        assert_eq!(json["text"], "Hello.");
    }

    #[test]
    fn test_track_kind_serde() {
        let track = CaptionTrack {
            language_code: "ja".to_string(),
            display_name: "Japanese".to_string(),
            kind: TrackKind::Auto,
            source_url: String::new(),
        };

        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["languageCode"], "ja");
        assert_eq!(json["name"], "Japanese");
        assert_eq!(json["kind"], "auto");
    }
}
