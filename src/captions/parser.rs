//! Timed-text document parsing and sentence grouping
//!
//! YouTube serves caption documents in two wire formats: `<text start=".."
//! dur="..">` with second-valued attributes, and `<p t=".." d="..">` with
//! millisecond-valued attributes. Fragments are grouped into sentence-level
//! units with a punctuation heuristic so each display line reads as a full
//! sentence rather than a caption-timing slice.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use super::{RawFragment, SubtitleUnit};

/// Default fragment duration when the `dur` attribute is empty
const DEFAULT_FRAGMENT_SECS: f64 = 2.0;

/// Characters that close a sentence-level unit
const SENTENCE_TERMINATORS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

/// Parse a raw timed-text document into sentence-grouped subtitle units.
///
/// Returns an empty sequence when neither format matches; absence of
/// captions is not an error.
pub fn parse_timed_text(raw: &str) -> Vec<SubtitleUnit> {
    let fragments = extract_fragments(raw);
    if fragments.is_empty() {
        return Vec::new();
    }
    group_into_sentences(fragments)
}

fn text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<text\s+start="([^"]+)"\s+dur="([^"]*)"[^>]*>(.*?)</text>"#).unwrap()
    })
}

fn p_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?is)<p\s+t="(\d+)"\s+d="(\d+)"[^>]*>(.*?)</p>"#).unwrap())
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

/// Extract raw fragments, trying the seconds format first and the
/// milliseconds format only when the first yields nothing.
fn extract_fragments(raw: &str) -> Vec<RawFragment> {
    let mut fragments = Vec::new();

    // Format 1: <text start="0.0" dur="2.0">content</text>
    for cap in text_regex().captures_iter(raw) {
        let start: f64 = match cap[1].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let duration: f64 = cap[2].parse().unwrap_or(DEFAULT_FRAGMENT_SECS);
        fragments.push(RawFragment {
            start_seconds: start,
            duration_seconds: duration,
            text: clean_fragment_text(&cap[3]),
        });
    }

    if !fragments.is_empty() {
        debug!("Parsed {} fragments from <text> format", fragments.len());
        return fragments;
    }

    // Format 2: <p t="10620" d="3000">content</p> (milliseconds)
    for cap in p_regex().captures_iter(raw) {
        let start_ms: u64 = match cap[1].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let duration_ms: u64 = match cap[2].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        fragments.push(RawFragment {
            start_seconds: start_ms as f64 / 1000.0,
            duration_seconds: duration_ms as f64 / 1000.0,
            text: clean_fragment_text(&cap[3]),
        });
    }

    if !fragments.is_empty() {
        debug!("Parsed {} fragments from <p> format", fragments.len());
    }
    fragments
}

/// Decode entities, strip residual markup, collapse newlines and trim
fn clean_fragment_text(text: &str) -> String {
    decode_entities(text).replace('\n', " ").trim().to_string()
}

/// Sequential entity replacement matching the upstream caption documents,
/// followed by stripping any remaining markup tags
fn decode_entities(text: &str) -> String {
    let decoded = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'");

    tag_regex().replace_all(&decoded, "").into_owned()
}

/// Walk fragments in order, accumulating until one ends in sentence
/// punctuation. The accumulated unit's duration always stretches to cover
/// the latest fragment's end, not a sum of fragment durations.
fn group_into_sentences(fragments: Vec<RawFragment>) -> Vec<SubtitleUnit> {
    let mut units = Vec::new();
    let mut current: Option<SubtitleUnit> = None;

    for frag in fragments {
        let ends_sentence = frag.text.trim().ends_with(SENTENCE_TERMINATORS);

        match current.as_mut() {
            None => {
                current = Some(SubtitleUnit {
                    start_seconds: frag.start_seconds,
                    duration_seconds: frag.duration_seconds.max(0.0),
                    text: frag.text,
                });
            }
            Some(unit) => {
                unit.text.push(' ');
                unit.text.push_str(&frag.text);
                // A fragment starting before the unit (out-of-order document)
                // must not shrink the duration below what is already covered
                unit.duration_seconds = ((frag.start_seconds + frag.duration_seconds)
                    - unit.start_seconds)
                    .max(unit.duration_seconds);
            }
        }

        if ends_sentence {
            if let Some(unit) = current.take() {
                units.push(unit);
            }
        }
    }

    // Trailing accumulation without terminal punctuation still becomes a unit
    if let Some(unit) = current {
        units.push(unit);
    }

    units
}
