//! Pipeline state machine
//!
//! Tracks a decode pipeline from start to release, including the bounded
//! retry budget for transient decode and network errors.

use std::fmt;
use std::time::Duration;

/// Process-unique pipeline identity
///
/// A URL can be served by several pipelines over time (released, then
/// attached again); the id tells them apart so late events and timers aimed
/// at an old pipeline are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineId(pub u64);

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipeline#{}", self.0)
    }
}

/// Pipeline lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Not started yet
    Idle,
    /// Session opened, waiting for the first playback event
    Starting,
    /// Frames are flowing
    Playing,
    /// Session stopped, GPU resources kept
    Paused,
    /// Decode or network error, waiting for a retry
    Error,
    /// Natural end of stream; bindings stay attached but go quiet
    Ended,
    /// Retry budget exhausted
    Dead,
    /// Released; terminal
    Released,
}

impl PipelineState {
    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Starting => "Starting",
            PipelineState::Playing => "Playing",
            PipelineState::Paused => "Paused",
            PipelineState::Error => "Error",
            PipelineState::Ended => "Ended",
            PipelineState::Dead => "Dead",
            PipelineState::Released => "Released",
        }
    }

    /// Check if the session is expected to produce frames
    pub fn is_decoding(&self) -> bool {
        matches!(self, PipelineState::Starting | PipelineState::Playing)
    }

    /// Check if no further transitions are possible except release
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Dead | PipelineState::Released)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Bounded retry policy for transient errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed before the stream is declared dead
    pub max_retries: u32,
    /// Fixed delay before each retry
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Duration::from_millis(2000),
        }
    }
}

/// What the scheduler must do after the pipeline processed an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Nothing to do
    None,
    /// Schedule a retry after the given delay
    RetryAfter(Duration),
    /// Retry budget exhausted; tear the pipeline and its bindings down
    StreamDead,
}
