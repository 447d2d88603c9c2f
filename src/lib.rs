/// LangClip - YouTube Language Learning Companion
///
/// Caption acquisition, sentence grouping, A/B loop playback, and a
/// bookmark library for studying spoken language in YouTube videos.

pub mod captions;
pub mod config;
pub mod library;
pub mod playback;
pub mod player;
pub mod proxy;
pub mod session;
pub mod subtitles;
pub mod video_id;

// Re-export main types for easy access
pub use crate::captions::{parse_timed_text, select_track, CaptionTrack, SubtitleUnit, TrackKind};
pub use crate::config::Config;
pub use crate::library::{Bookmark, JsonFileStore, Library, StateStore, VideoEntry};
pub use crate::playback::{LoopController, LoopState, LoopToggle};
pub use crate::player::{PlaybackState, PlayerEvent, PlayerHandle};
pub use crate::session::{Session, TickOutcome};
pub use crate::subtitles::{CaptionSource, SubtitleService};
pub use crate::video_id::{extract_video_id, is_valid_video_id};
