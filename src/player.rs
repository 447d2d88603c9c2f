//! Abstract playback widget interface
//!
//! The session never assumes a specific widget implementation, only that the
//! host forwards these calls to one and delivers lifecycle and periodic
//! time-tick notifications back.

/// Host-side handle to the video playback widget
pub trait PlayerHandle {
    /// Load (or switch to) a video by id
    fn load(&mut self, video_id: &str);

    /// Live playback position in seconds
    fn current_time(&self) -> f64;

    /// Total video duration in seconds
    fn duration(&self) -> f64;

    fn seek_to(&mut self, seconds: f64);

    fn set_playback_rate(&mut self, rate: f64);
}

/// Widget playback state, as reported by state-change events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Buffering,
    Ended,
}

/// Notifications the widget emits toward the session
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Widget finished initializing; title may be available
    Ready { title: Option<String> },

    StateChange(PlaybackState),

    /// Periodic position report, at the configured tick cadence
    Tick { position: f64 },
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Scripted in-memory player for session tests
    #[derive(Debug, Default)]
    pub struct FakePlayer {
        pub loaded: Vec<String>,
        pub position: f64,
        pub duration: f64,
        pub seeks: Vec<f64>,
        pub rate: f64,
    }

    impl PlayerHandle for FakePlayer {
        fn load(&mut self, video_id: &str) {
            self.loaded.push(video_id.to_string());
            self.position = 0.0;
        }

        fn current_time(&self) -> f64 {
            self.position
        }

        fn duration(&self) -> f64 {
            self.duration
        }

        fn seek_to(&mut self, seconds: f64) {
            self.seeks.push(seconds);
            self.position = seconds;
        }

        fn set_playback_rate(&mut self, rate: f64) {
            self.rate = rate;
        }
    }
}
