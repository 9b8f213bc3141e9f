//! Decode pipeline
//!
//! One pipeline per source URL. It exclusively owns the decode session, the
//! intermediate texture the session streams into, and the off-screen target
//! that holds the last rendered frame for fan-out.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::decode::{
    DecodeEngine, DecodeEvent, DecodeEventSink, DecodeSession, FrameSignal, MediaOptions,
    SessionOutput,
};
use crate::error::{DecodeError, GraphicsError, Result};
use crate::graphics::{
    Allocation, BindTarget, GraphicsContext, OffscreenTarget, SurfaceHandle, TextureId, Transform,
};

use super::state::{EventOutcome, PipelineId, PipelineState, RetryPolicy};

/// Decode pipeline for a single source
pub struct DecodePipeline<S> {
    id: PipelineId,
    url: Arc<str>,
    options: MediaOptions,
    width: u32,
    height: u32,
    state: PipelineState,
    retry: RetryPolicy,
    retry_count: u32,
    session: Option<S>,
    offscreen: Allocation<OffscreenTarget>,
    intermediate: Allocation<TextureId>,
    frames: FrameSignal,
    frame_transform: Transform,
    first_frame_received: bool,
    frames_rendered: u64,
    bound: HashSet<SurfaceHandle>,
    active: HashSet<SurfaceHandle>,
    created_at: Instant,
}

impl<S: DecodeSession> DecodePipeline<S> {
    /// Create an idle pipeline; nothing is allocated until [`start`](Self::start)
    pub fn new(
        id: PipelineId,
        url: impl Into<Arc<str>>,
        options: MediaOptions,
        width: u32,
        height: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            options,
            width,
            height,
            state: PipelineState::Idle,
            retry,
            retry_count: 0,
            session: None,
            offscreen: Allocation::Unallocated,
            intermediate: Allocation::Unallocated,
            frames: FrameSignal::new(),
            frame_transform: Transform::IDENTITY,
            first_frame_received: false,
            frames_rendered: 0,
            bound: HashSet::new(),
            active: HashSet::new(),
            created_at: Instant::now(),
        }
    }

    /// Allocate GPU resources and open the decode session
    ///
    /// On failure everything allocated so far is released again and the
    /// pipeline ends up `Released`.
    pub fn start<G, E>(&mut self, gfx: &mut G, engine: &mut E, events: DecodeEventSink) -> Result<()>
    where
        G: GraphicsContext,
        E: DecodeEngine<Session = S>,
    {
        if let Err(e) = self.try_start(gfx, engine, events) {
            tracing::warn!(url = %self.url, pipeline = %self.id, error = %e, "Pipeline start failed");
            self.release(gfx);
            return Err(e);
        }

        tracing::info!(
            url = %self.url,
            pipeline = %self.id,
            width = self.width,
            height = self.height,
            "Pipeline started"
        );
        Ok(())
    }

    fn try_start<G, E>(&mut self, gfx: &mut G, engine: &mut E, events: DecodeEventSink) -> Result<()>
    where
        G: GraphicsContext,
        E: DecodeEngine<Session = S>,
    {
        self.offscreen = Allocation::Allocated(gfx.create_offscreen_target(self.width, self.height)?);
        let texture = gfx.create_external_texture()?;
        self.intermediate = Allocation::Allocated(texture);

        let output = SessionOutput {
            texture,
            width: self.width,
            height: self.height,
            events,
            frames: self.frames.clone(),
        };
        let session = self.session.insert(engine.create_session(output)?);

        session.open(&self.url, &self.options)?;
        session.play()?;
        self.state = PipelineState::Starting;
        Ok(())
    }

    /// Stop decoding without releasing GPU resources
    ///
    /// Only a running session is paused. An ended stream stays ended and a
    /// failed one keeps waiting for its scheduled retry.
    pub fn pause(&mut self) {
        if !self.state.is_decoding() {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.stop();
        }
        self.state = PipelineState::Paused;
        tracing::debug!(url = %self.url, pipeline = %self.id, "Pipeline paused");
    }

    /// Reopen a fresh media instance after [`pause`](Self::pause)
    pub fn resume(&mut self) -> std::result::Result<(), DecodeError> {
        if self.state != PipelineState::Paused {
            return Ok(());
        }
        self.reopen()?;
        tracing::debug!(url = %self.url, pipeline = %self.id, "Pipeline resumed");
        Ok(())
    }

    fn reopen(&mut self) -> std::result::Result<(), DecodeError> {
        let Some(session) = self.session.as_mut() else {
            return Err(DecodeError::Session("no session".into()));
        };

        self.state = PipelineState::Starting;
        session.stop();
        session.open(&self.url, &self.options)?;
        session.play()
    }

    /// Stop and destroy the session, then free GPU resources
    ///
    /// A second call is a no-op.
    pub fn release<G: GraphicsContext>(&mut self, gfx: &mut G) {
        if self.state == PipelineState::Released {
            return;
        }

        if let Some(mut session) = self.session.take() {
            session.stop();
            session.release();
        }
        if let Some(texture) = self.intermediate.take() {
            gfx.destroy_texture(texture);
        }
        if let Some(target) = self.offscreen.take() {
            gfx.destroy_offscreen_target(target);
        }

        self.frames.take();
        self.state = PipelineState::Released;
        tracing::info!(
            url = %self.url,
            pipeline = %self.id,
            frames_rendered = self.frames_rendered,
            lifetime_ms = self.created_at.elapsed().as_millis() as u64,
            "Pipeline released"
        );
    }

    /// Advance the state machine with an engine event
    pub fn handle_event(&mut self, event: DecodeEvent) -> EventOutcome {
        match event {
            DecodeEvent::Playing => {
                if self.state == PipelineState::Starting {
                    if self.retry_count > 0 {
                        tracing::info!(
                            url = %self.url,
                            retries = self.retry_count,
                            "Stream recovered"
                        );
                    }
                    self.state = PipelineState::Playing;
                    self.retry_count = 0;
                }
                EventOutcome::None
            }
            DecodeEvent::Error(msg) => self.on_error(&msg),
            DecodeEvent::EndReached => {
                if self.state.is_decoding() {
                    self.state = PipelineState::Ended;
                    tracing::info!(url = %self.url, pipeline = %self.id, "End of stream");
                }
                EventOutcome::None
            }
            DecodeEvent::Stopped => {
                tracing::trace!(url = %self.url, pipeline = %self.id, "Session stopped");
                EventOutcome::None
            }
        }
    }

    fn on_error(&mut self, msg: &str) -> EventOutcome {
        // Errors only count while the session is supposed to be running;
        // repeats while a retry is already pending are the same failure.
        if !self.state.is_decoding() {
            return EventOutcome::None;
        }

        self.state = PipelineState::Error;
        self.retry_count += 1;

        if self.retry_count <= self.retry.max_retries {
            tracing::warn!(
                url = %self.url,
                pipeline = %self.id,
                error = msg,
                attempt = self.retry_count,
                max_retries = self.retry.max_retries,
                "Decode error, retry scheduled"
            );
            EventOutcome::RetryAfter(self.retry.backoff)
        } else {
            tracing::error!(
                url = %self.url,
                pipeline = %self.id,
                error = msg,
                retries = self.retry_count - 1,
                "Retry budget exhausted, stream dead"
            );
            self.state = PipelineState::Dead;
            EventOutcome::StreamDead
        }
    }

    /// Run a scheduled retry
    pub fn retry(&mut self) -> EventOutcome {
        if self.state != PipelineState::Error {
            return EventOutcome::None;
        }

        tracing::debug!(url = %self.url, attempt = self.retry_count, "Retrying stream");
        match self.reopen() {
            Ok(()) => EventOutcome::None,
            Err(e) => self.on_error(&e.to_string()),
        }
    }

    /// Pull a pending frame into the off-screen target
    ///
    /// Consumes the frame-available flag. Returns `Ok(false)` when there was
    /// nothing new to render.
    pub fn render_frame<G: GraphicsContext>(&mut self, gfx: &mut G) -> Result<bool> {
        if !self.frames.take() {
            return Ok(false);
        }

        let (Some(target), Some(texture)) = (self.offscreen.get(), self.intermediate.get()) else {
            return Err(GraphicsError::InvalidTarget.into());
        };
        let Some(session) = self.session.as_mut() else {
            return Err(DecodeError::Session("no session".into()).into());
        };

        self.frame_transform = session.latch_frame()?;
        self.first_frame_received = true;

        gfx.blit(
            texture,
            BindTarget::Offscreen(target),
            &self.frame_transform,
            self.width,
            self.height,
        )?;
        self.frames_rendered += 1;
        Ok(true)
    }

    /// Add a surface to the bound and active sets
    pub fn bind(&mut self, surface: SurfaceHandle) {
        self.bound.insert(surface);
        self.active.insert(surface);
    }

    /// Remove a surface from both sets
    pub fn unbind(&mut self, surface: SurfaceHandle) -> bool {
        self.active.remove(&surface);
        self.bound.remove(&surface)
    }

    /// Move a bound surface in or out of the active set
    ///
    /// Returns false if the surface is not bound to this pipeline.
    pub fn set_active(&mut self, surface: SurfaceHandle, active: bool) -> bool {
        if !self.bound.contains(&surface) {
            return false;
        }
        if active {
            self.active.insert(surface);
        } else {
            self.active.remove(&surface);
        }
        true
    }

    /// Off-screen target and decode size, if a frame has been produced
    pub fn capture_source(&self) -> Option<(OffscreenTarget, u32, u32)> {
        if !self.first_frame_received {
            return None;
        }
        self.offscreen.get().map(|t| (t, self.width, self.height))
    }

    /// Get the pipeline identity
    pub fn id(&self) -> PipelineId {
        self.id
    }

    /// Get the source URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn url_arc(&self) -> Arc<str> {
        Arc::clone(&self.url)
    }

    /// Get the current state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Whether the session is expected to produce frames
    pub fn is_decoding(&self) -> bool {
        self.state.is_decoding()
    }

    /// Get the consecutive error count since the last successful start
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Get the number of frames drawn into the off-screen target
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Whether at least one frame has been latched
    pub fn has_first_frame(&self) -> bool {
        self.first_frame_received
    }

    /// Check for a pending frame without consuming it
    pub fn has_pending_frame(&self) -> bool {
        self.frames.is_pending()
    }

    /// Get the off-screen target, if allocated
    pub fn offscreen(&self) -> Option<OffscreenTarget> {
        self.offscreen.get()
    }

    /// Get the decode resolution
    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get every attached surface
    pub fn bound(&self) -> &HashSet<SurfaceHandle> {
        &self.bound
    }

    /// Get the surfaces eligible to receive frames
    pub fn active(&self) -> &HashSet<SurfaceHandle> {
        &self.active
    }

    /// Whether `surface` is attached to this pipeline
    pub fn is_bound(&self, surface: SurfaceHandle) -> bool {
        self.bound.contains(&surface)
    }

    /// Whether any surface is attached
    pub fn has_bound(&self) -> bool {
        !self.bound.is_empty()
    }

    /// Whether any attached surface is visible
    pub fn has_active(&self) -> bool {
        !self.active.is_empty()
    }
}
