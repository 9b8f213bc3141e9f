//! In-crate fakes for the external collaborators
//!
//! Each fake shares its state behind an `Arc<Mutex<_>>` so a test can keep a
//! probe while the original is moved into the scheduler task.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::clock::{RefreshClock, TickCallback};
use crate::decode::{
    DecodeEngine, DecodeEvent, DecodeEventSink, DecodeSession, MediaOptions, SessionOutput,
};
use crate::error::{DecodeError, GraphicsError};
use crate::graphics::{
    BindTarget, FramebufferId, GraphicsContext, OffscreenTarget, RenderTargetHandle,
    SurfaceHandle, TextureId, Transform,
};

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub enum GfxCall {
    CreateOffscreen(u32, u32),
    DestroyOffscreen(OffscreenTarget),
    CreateTexture(TextureId),
    DestroyTexture(TextureId),
    CreateRenderTarget(SurfaceHandle),
    DestroyRenderTarget(RenderTargetHandle),
    Bind(BindTarget),
    Blit {
        src: TextureId,
        dst: BindTarget,
        width: u32,
        height: u32,
    },
    Swap(RenderTargetHandle),
    SwapInterval(u32),
    ReadPixels(OffscreenTarget, u32, u32),
    Teardown,
}

#[derive(Default)]
struct GfxState {
    calls: Vec<GfxCall>,
    next_id: u32,
    offscreen: HashSet<OffscreenTarget>,
    textures: HashSet<TextureId>,
    render_targets: HashMap<RenderTargetHandle, SurfaceHandle>,
    destroyed_targets: HashSet<RenderTargetHandle>,
    stale_draws: usize,
    invalid_surfaces: HashSet<SurfaceHandle>,
    fail_render_targets: bool,
    fail_swaps: bool,
}

impl GfxState {
    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Count any use of a render target after it was destroyed
    fn check_target(&mut self, target: BindTarget) {
        if let BindTarget::Surface(rt) = target {
            if self.destroyed_targets.contains(&rt) {
                self.stale_draws += 1;
            }
        }
    }
}

/// Recording graphics context
#[derive(Clone, Default)]
pub struct FakeGraphics {
    state: Arc<Mutex<GfxState>>,
}

impl FakeGraphics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GfxCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&GfxCall) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Number of blits into display surfaces
    pub fn surface_blits(&self) -> usize {
        self.count(|c| matches!(c, GfxCall::Blit { dst: BindTarget::Surface(_), .. }))
    }

    /// Blits into the render target created for `surface`
    pub fn blits_to(&self, surface: SurfaceHandle) -> Vec<(u32, u32)> {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter_map(|c| match c {
                GfxCall::Blit {
                    dst: BindTarget::Surface(rt),
                    width,
                    height,
                    ..
                } if state.render_targets.get(rt) == Some(&surface) => Some((*width, *height)),
                _ => None,
            })
            .collect()
    }

    pub fn live_offscreen(&self) -> usize {
        self.state.lock().unwrap().offscreen.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.lock().unwrap().textures.len()
    }

    /// Render targets created and not yet destroyed
    pub fn live_render_targets(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .render_targets
            .keys()
            .filter(|rt| !state.destroyed_targets.contains(rt))
            .count()
    }

    /// Binds, blits and swaps that hit an already destroyed render target
    pub fn stale_draws(&self) -> usize {
        self.state.lock().unwrap().stale_draws
    }

    pub fn invalidate_surface(&self, surface: SurfaceHandle) {
        self.state.lock().unwrap().invalid_surfaces.insert(surface);
    }

    pub fn fail_render_targets(&self, fail: bool) {
        self.state.lock().unwrap().fail_render_targets = fail;
    }

    pub fn fail_swaps(&self, fail: bool) {
        self.state.lock().unwrap().fail_swaps = fail;
    }
}

impl GraphicsContext for FakeGraphics {
    fn create_offscreen_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<OffscreenTarget, GraphicsError> {
        let mut state = self.state.lock().unwrap();
        let target = OffscreenTarget {
            framebuffer: FramebufferId(state.next()),
            texture: TextureId(state.next()),
        };
        state.offscreen.insert(target);
        state.calls.push(GfxCall::CreateOffscreen(width, height));
        Ok(target)
    }

    fn destroy_offscreen_target(&mut self, target: OffscreenTarget) {
        let mut state = self.state.lock().unwrap();
        state.offscreen.remove(&target);
        state.calls.push(GfxCall::DestroyOffscreen(target));
    }

    fn create_external_texture(&mut self) -> Result<TextureId, GraphicsError> {
        let mut state = self.state.lock().unwrap();
        let texture = TextureId(state.next());
        state.textures.insert(texture);
        state.calls.push(GfxCall::CreateTexture(texture));
        Ok(texture)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        let mut state = self.state.lock().unwrap();
        state.textures.remove(&texture);
        state.calls.push(GfxCall::DestroyTexture(texture));
    }

    fn create_render_target(
        &mut self,
        surface: SurfaceHandle,
    ) -> Result<RenderTargetHandle, GraphicsError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_render_targets {
            return Err(GraphicsError::Allocation("surface not ready".into()));
        }
        let target = RenderTargetHandle(u64::from(state.next()));
        state.render_targets.insert(target, surface);
        state.calls.push(GfxCall::CreateRenderTarget(surface));
        Ok(target)
    }

    fn destroy_render_target(&mut self, target: RenderTargetHandle) {
        let mut state = self.state.lock().unwrap();
        state.destroyed_targets.insert(target);
        state.calls.push(GfxCall::DestroyRenderTarget(target));
    }

    fn is_render_target_valid(&self, target: RenderTargetHandle) -> bool {
        let state = self.state.lock().unwrap();
        if state.destroyed_targets.contains(&target) {
            return false;
        }
        match state.render_targets.get(&target) {
            Some(surface) => !state.invalid_surfaces.contains(surface),
            None => false,
        }
    }

    fn bind(&mut self, target: BindTarget) -> Result<(), GraphicsError> {
        let mut state = self.state.lock().unwrap();
        state.check_target(target);
        state.calls.push(GfxCall::Bind(target));
        Ok(())
    }

    fn blit(
        &mut self,
        src: TextureId,
        dst: BindTarget,
        _transform: &Transform,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.lock().unwrap();
        state.check_target(dst);
        state.calls.push(GfxCall::Blit {
            src,
            dst,
            width,
            height,
        });
        Ok(())
    }

    fn swap_buffers(&mut self, target: RenderTargetHandle) -> Result<(), GraphicsError> {
        let mut state = self.state.lock().unwrap();
        state.check_target(BindTarget::Surface(target));
        state.calls.push(GfxCall::Swap(target));
        if state.fail_swaps {
            return Err(GraphicsError::Swap("EGL_BAD_SURFACE".into()));
        }
        Ok(())
    }

    fn set_swap_interval(&mut self, interval: u32) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(GfxCall::SwapInterval(interval));
    }

    fn read_pixels(
        &mut self,
        target: OffscreenTarget,
        width: u32,
        height: u32,
    ) -> Result<Bytes, GraphicsError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(GfxCall::ReadPixels(target, width, height));
        Ok(Bytes::from(vec![0xAB; (width * height * 4) as usize]))
    }

    fn teardown(&mut self) {
        self.state.lock().unwrap().calls.push(GfxCall::Teardown);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Open(String),
    Play,
    Stop,
    Latch,
    Release,
}

#[derive(Default)]
struct EngineState {
    sessions_created: u32,
    outputs: HashMap<String, SessionOutput>,
    calls: HashMap<String, Vec<SessionCall>>,
    fail_open: HashSet<String>,
    fail_latch: HashSet<String>,
}

/// Recording decode engine
#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions_created(&self) -> u32 {
        self.state.lock().unwrap().sessions_created
    }

    pub fn session_calls(&self, url: &str) -> Vec<SessionCall> {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_open(&self, url: &str) {
        self.state.lock().unwrap().fail_open.insert(url.to_string());
    }

    pub fn fail_latch(&self, url: &str) {
        self.state.lock().unwrap().fail_latch.insert(url.to_string());
    }

    /// Simulate the engine's frame callback for the latest session of `url`
    pub fn push_frame(&self, url: &str) {
        if let Some(output) = self.state.lock().unwrap().outputs.get(url) {
            output.frames.notify();
        }
    }

    /// Event sink handed to the latest session of `url`
    pub fn sink(&self, url: &str) -> Option<DecodeEventSink> {
        self.state
            .lock()
            .unwrap()
            .outputs
            .get(url)
            .map(|o| o.events.clone())
    }

    /// Simulate a lifecycle event from the engine thread
    pub fn emit(&self, url: &str, event: DecodeEvent) -> bool {
        self.sink(url).is_some_and(|s| s.emit(event))
    }
}

impl DecodeEngine for FakeEngine {
    type Session = FakeSession;

    fn create_session(&mut self, output: SessionOutput) -> Result<FakeSession, DecodeError> {
        let mut state = self.state.lock().unwrap();
        state.sessions_created += 1;
        let url = output.events.url().to_string();
        state.outputs.insert(url.clone(), output);
        Ok(FakeSession {
            url,
            engine: Arc::clone(&self.state),
        })
    }
}

pub struct FakeSession {
    url: String,
    engine: Arc<Mutex<EngineState>>,
}

impl FakeSession {
    fn record(&self, call: SessionCall) {
        self.engine
            .lock()
            .unwrap()
            .calls
            .entry(self.url.clone())
            .or_default()
            .push(call);
    }
}

impl DecodeSession for FakeSession {
    fn open(&mut self, url: &str, _options: &MediaOptions) -> Result<(), DecodeError> {
        self.record(SessionCall::Open(url.to_string()));
        if self.engine.lock().unwrap().fail_open.contains(url) {
            return Err(DecodeError::Open("connection refused".into()));
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), DecodeError> {
        self.record(SessionCall::Play);
        Ok(())
    }

    fn stop(&mut self) {
        self.record(SessionCall::Stop);
    }

    fn latch_frame(&mut self) -> Result<Transform, DecodeError> {
        self.record(SessionCall::Latch);
        if self.engine.lock().unwrap().fail_latch.contains(&self.url) {
            return Err(DecodeError::Latch("surface abandoned".into()));
        }
        Ok(Transform::IDENTITY)
    }

    fn release(&mut self) {
        self.record(SessionCall::Release);
    }
}

/// Refresh clock fired by hand
#[derive(Clone, Default)]
pub struct ManualClock {
    pending: Arc<Mutex<Option<TickCallback>>>,
    registrations: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the outstanding registration, if any
    pub fn fire(&self) -> bool {
        let callback = self.pending.lock().unwrap().take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.pending.lock().unwrap().is_some()
    }

    pub fn registrations(&self) -> u32 {
        self.registrations.load(Ordering::SeqCst)
    }
}

impl RefreshClock for ManualClock {
    fn post_next_tick(&mut self, callback: TickCallback) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        *self.pending.lock().unwrap() = Some(callback);
    }

    fn cancel(&mut self) {
        self.pending.lock().unwrap().take();
    }
}
