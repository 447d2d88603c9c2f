//! Video id extraction from user input

use regex::Regex;
use std::sync::OnceLock;

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)([a-zA-Z0-9_-]{11})",
        )
        .unwrap()
    })
}

fn bare_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-zA-Z0-9_-]{11})$").unwrap())
}

/// Extract an 11-character video id from a full platform URL (watch,
/// short-link, embed, `/v/`, shorts) or a bare id. Returns `None` for
/// anything unrecognized.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Some(cap) = url_regex().captures(input) {
        return Some(cap[1].to_string());
    }

    bare_id_regex().captures(input).map(|cap| cap[1].to_string())
}

/// Check an already-extracted id against the 11-character alphabet
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
