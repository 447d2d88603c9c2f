//! Caption track selection policy

use super::CaptionTrack;

/// Default language preference order
pub const DEFAULT_PREFERRED_LANGUAGES: [&str; 2] = ["ja", "en"];

/// Pick the best track from a non-empty list: first track matching each
/// preferred language in order, else the first track offered.
///
/// Returns `None` only for an empty input. No network or state side effects.
pub fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    preferred_languages: &[String],
) -> Option<&'a CaptionTrack> {
    if tracks.is_empty() {
        return None;
    }

    for lang in preferred_languages {
        if let Some(track) = tracks.iter().find(|t| &t.language_code == lang) {
            return Some(track);
        }
    }

    tracks.first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::TrackKind;

    fn track(lang: &str) -> CaptionTrack {
        CaptionTrack {
            language_code: lang.to_string(),
            display_name: lang.to_uppercase(),
            kind: TrackKind::Manual,
            source_url: format!("https://example.com/{lang}"),
        }
    }

    fn prefs() -> Vec<String> {
        DEFAULT_PREFERRED_LANGUAGES
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_prefers_japanese() {
        let tracks = vec![track("en"), track("ja"), track("fr")];
        let selected = select_track(&tracks, &prefs()).unwrap();
        assert_eq!(selected.language_code, "ja");
    }

    #[test]
    fn test_falls_back_to_english() {
        let tracks = vec![track("fr"), track("en")];
        let selected = select_track(&tracks, &prefs()).unwrap();
        assert_eq!(selected.language_code, "en");
    }

    #[test]
    fn test_falls_back_to_first() {
        let tracks = vec![track("fr"), track("de")];
        let selected = select_track(&tracks, &prefs()).unwrap();
        assert_eq!(selected.language_code, "fr");
    }

    #[test]
    fn test_empty_input() {
        assert!(select_track(&[], &prefs()).is_none());
    }
}
