//! Decode engine contract
//!
//! The native engine (frame production from a URL) is an external
//! collaborator. The scheduler only needs to create a session bound to an
//! intermediate texture, feed it a URL with options, and start/stop it.

use crate::error::DecodeError;
use crate::graphics::{TextureId, Transform};

use super::event::{DecodeEventSink, FrameSignal};

/// Ordered list of engine directives (`key` or `key=value`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaOptions {
    directives: Vec<String>,
}

impl MediaOptions {
    /// Create an empty option list
    pub fn new() -> Self {
        Self::default()
    }

    /// Directives tuned for live network sources
    pub fn low_latency() -> Self {
        Self::new()
            .option(":network-caching=300")
            .option(":clock-jitter=0")
            .option(":clock-synchro=0")
    }

    /// Append a directive, keeping insertion order
    pub fn option(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Iterate directives in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.directives.iter().map(String::as_str)
    }

    /// Number of directives
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// Check if there are no directives
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for MediaOptions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            directives: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Where a session delivers its output
#[derive(Debug, Clone)]
pub struct SessionOutput {
    /// Intermediate texture the engine streams frames into
    pub texture: TextureId,
    /// Requested output width
    pub width: u32,
    /// Requested output height
    pub height: u32,
    /// Lifecycle event callback
    pub events: DecodeEventSink,
    /// Frame-available callback
    pub frames: FrameSignal,
}

/// Factory for decode sessions
pub trait DecodeEngine {
    /// Session type produced by this engine
    type Session: DecodeSession;

    /// Create a session wired to the given output
    fn create_session(&mut self, output: SessionOutput) -> Result<Self::Session, DecodeError>;
}

/// One decode session against one source
pub trait DecodeSession {
    /// Load a fresh media instance for `url` with the given options
    fn open(&mut self, url: &str, options: &MediaOptions) -> Result<(), DecodeError>;

    /// Start playback of the opened media
    fn play(&mut self) -> Result<(), DecodeError>;

    /// Stop playback, keeping the session and its output surface
    fn stop(&mut self);

    /// Pull the most recent frame into the intermediate texture
    ///
    /// Returns the texture transform the engine reports for that frame.
    fn latch_frame(&mut self) -> Result<Transform, DecodeError>;

    /// Detach from the output surface and destroy the session
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_keep_order() {
        let options = MediaOptions::new().option(":rtsp-tcp").option(":network-caching=150");
        let collected: Vec<&str> = options.iter().collect();

        assert_eq!(collected, vec![":rtsp-tcp", ":network-caching=150"]);
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_low_latency_defaults() {
        let options = MediaOptions::low_latency();

        assert!(!options.is_empty());
        assert!(options.iter().any(|d| d.starts_with(":network-caching=")));
    }

    #[test]
    fn test_from_iter() {
        let options: MediaOptions = [":no-audio", ":rtsp-tcp"].into_iter().collect();
        assert_eq!(options.len(), 2);
    }
}
