//! Decode session events
//!
//! Engines run their own threads. They never touch scheduler state directly:
//! lifecycle events are posted into the scheduler's command queue through a
//! [`DecodeEventSink`], and new frames only flip a [`FrameSignal`] that is
//! read and cleared on the scheduler thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::pipeline::PipelineId;
use crate::scheduler::command::Command;

/// Lifecycle events emitted by a decode session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// Playback started successfully
    Playing,
    /// Decode or network error
    Error(String),
    /// Natural end of stream
    EndReached,
    /// Session stopped
    Stopped,
}

/// Cross-thread "new frame available" flag
///
/// Set by the engine's frame callback, consumed by the render tick.
#[derive(Debug, Clone, Default)]
pub struct FrameSignal {
    pending: Arc<AtomicBool>,
}

impl FrameSignal {
    /// Create a cleared signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a new frame as available (engine side)
    pub fn notify(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Check for a pending frame without consuming it
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume the pending flag, returning whether a frame was pending
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

/// Routes a session's lifecycle events into the scheduler queue
///
/// Holds only a weak sender so sessions never keep the scheduler alive.
/// Events are tagged with the pipeline identity so that events from a
/// released pipeline are discarded even if a new pipeline reuses the URL.
#[derive(Debug, Clone)]
pub struct DecodeEventSink {
    url: Arc<str>,
    pipeline: PipelineId,
    tx: mpsc::WeakUnboundedSender<Command>,
}

impl DecodeEventSink {
    pub(crate) fn new(
        url: Arc<str>,
        pipeline: PipelineId,
        tx: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        Self { url, pipeline, tx }
    }

    /// Post an event to the scheduler
    ///
    /// Returns false if the scheduler is gone.
    pub fn emit(&self, event: DecodeEvent) -> bool {
        let Some(tx) = self.tx.upgrade() else {
            return false;
        };

        tx.send(Command::Decode {
            url: self.url.to_string(),
            pipeline: self.pipeline,
            event,
        })
        .is_ok()
    }

    /// Source this sink reports for
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Pipeline this sink reports for
    pub fn pipeline(&self) -> PipelineId {
        self.pipeline
    }
}
