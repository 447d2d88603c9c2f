//! A/B loop playback state machine
//!
//! Tracks two user-marked loop points and enforces them against the live
//! playback position on every host tick. The two-step toggle captures whole
//! seconds; the bookmark entry path keeps the stored fractional values.

use thiserror::Error;

/// Loop playback state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopState {
    /// No loop points set
    Idle,
    /// Point A captured, waiting for point B
    PointASet { a: f64 },
    /// Active loop between A and B
    Looping { a: f64, b: f64 },
}

/// Outcome of a toggle action, for the host to report to the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopToggle {
    /// Point A captured at the given position
    PointASet(f64),
    /// Loop started over the given span
    Started { a: f64, b: f64 },
    /// An active loop was cleared
    Cleared,
}

#[derive(Debug, Error, PartialEq)]
pub enum LoopError {
    /// User-visible validation failure; no state change occurred
    #[error("point B must be set after point A")]
    EndNotAfterStart,
}

/// A/B loop controller
#[derive(Debug)]
pub struct LoopController {
    state: LoopState,
}

impl LoopController {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_looping(&self) -> bool {
        matches!(self.state, LoopState::Looping { .. })
    }

    /// Advance the toggle cycle idle -> A-set -> looping -> idle.
    ///
    /// Setting B at or before A is rejected: the error is surfaced to the
    /// user and the state stays at A-set.
    pub fn toggle(&mut self, position: f64) -> Result<LoopToggle, LoopError> {
        match self.state {
            LoopState::Idle => {
                let a = position.floor();
                self.state = LoopState::PointASet { a };
                Ok(LoopToggle::PointASet(a))
            }
            LoopState::PointASet { a } => {
                let b = position.floor();
                if b <= a {
                    return Err(LoopError::EndNotAfterStart);
                }
                self.state = LoopState::Looping { a, b };
                Ok(LoopToggle::Started { a, b })
            }
            LoopState::Looping { .. } => {
                self.state = LoopState::Idle;
                Ok(LoopToggle::Cleared)
            }
        }
    }

    /// Reset to idle from any state
    pub fn clear(&mut self) {
        self.state = LoopState::Idle;
    }

    /// Enter the loop directly over a stored span, bypassing the two-step
    /// toggle (bookmark review path)
    pub fn loop_span(&mut self, start: f64, duration: f64) {
        self.state = LoopState::Looping {
            a: start,
            b: start + duration,
        };
    }

    /// Periodic enforcement: while looping, a position at or past B yields
    /// the seek target A. Strict repeat, no pause.
    pub fn check(&self, position: f64) -> Option<f64> {
        match self.state {
            LoopState::Looping { a, b } if position >= b => Some(a),
            _ => None,
        }
    }
}

impl Default for LoopController {
    fn default() -> Self {
        Self::new()
    }
}
