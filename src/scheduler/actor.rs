//! Stream render scheduler
//!
//! The scheduler is a single-threaded actor. It exclusively owns both
//! registries, every pipeline and binding, the graphics context and the
//! refresh clock. All mutation happens inside [`StreamRenderScheduler::run`],
//! one command at a time.

use std::collections::HashMap;
use std::thread;

use tokio::sync::mpsc;

use crate::binding::DisplayBinding;
use crate::clock::RefreshClock;
use crate::decode::{DecodeEngine, DecodeEvent, DecodeEventSink, MediaOptions};
use crate::error::{Result, SchedulerError};
use crate::graphics::{GraphicsContext, SurfaceHandle};
use crate::pipeline::{DecodePipeline, EventOutcome, PipelineId, PipelineState};

use super::command::Command;
use super::config::{SchedulerConfig, SuspendPolicy};
use super::diagnostics::{FrameSnapshot, PipelineDiagnostics, SchedulerDiagnostics};
use super::handle::{SchedulerHandle, SchedulerThread};
use super::tick::TickReport;
use super::timer::TimerSet;

/// Orchestrates decode pipelines and display bindings
pub struct StreamRenderScheduler<G, E: DecodeEngine, C> {
    pub(super) config: SchedulerConfig,
    pub(super) graphics: G,
    pub(super) engine: E,
    pub(super) clock: C,

    /// Live pipelines keyed by source URL
    pub(super) pipelines: HashMap<String, DecodePipeline<E::Session>>,

    /// Display bindings keyed by surface
    pub(super) bindings: HashMap<SurfaceHandle, DisplayBinding>,

    pub(super) pending_release: TimerSet,
    pub(super) pending_retry: TimerSet,

    pub(super) admission_limit: usize,
    pub(super) next_pipeline_id: u64,

    /// A refresh registration is outstanding
    pub(super) tick_registered: bool,
    pub(super) ticks: u64,
    pub(super) last_tick: TickReport,

    pub(super) tx: mpsc::WeakUnboundedSender<Command>,
    pub(super) shut_down: bool,
}

impl<G, E, C> StreamRenderScheduler<G, E, C>
where
    G: GraphicsContext + Send + 'static,
    E: DecodeEngine + Send + 'static,
    E::Session: Send + 'static,
    C: RefreshClock + Send + 'static,
{
    /// Spawn the scheduler task on the current tokio runtime
    pub fn spawn(config: SchedulerConfig, graphics: G, engine: E, clock: C) -> SchedulerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self::new(config, graphics, engine, clock, tx.downgrade());

        tokio::spawn(scheduler.run(rx));
        SchedulerHandle::new(tx)
    }
}

impl<G, E, C> StreamRenderScheduler<G, E, C>
where
    G: GraphicsContext + 'static,
    E: DecodeEngine + 'static,
    C: RefreshClock + 'static,
{
    /// Start the scheduler on a dedicated OS thread
    ///
    /// The thread runs its own current-thread runtime. `factory` is called on
    /// that thread, so a graphics context bound to its creating thread never
    /// has to cross threads.
    pub fn spawn_dedicated<F>(config: SchedulerConfig, factory: F) -> std::io::Result<SchedulerThread>
    where
        F: FnOnce(&SchedulerConfig) -> Result<(G, E, C)> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let weak = tx.downgrade();
        let name = config.thread_name.clone();

        let thread = thread::Builder::new().name(name).spawn(move || -> Result<()> {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build scheduler runtime");
                    return Err(SchedulerError::Closed.into());
                }
            };

            let (graphics, engine, clock) = factory(&config).inspect_err(|e| {
                tracing::error!(error = %e, "Scheduler initialization failed");
            })?;

            let scheduler = Self::new(config, graphics, engine, clock, weak);
            runtime.block_on(scheduler.run(rx));
            Ok(())
        })?;

        Ok(SchedulerThread::new(SchedulerHandle::new(tx), thread))
    }
}

impl<G, E, C> StreamRenderScheduler<G, E, C>
where
    G: GraphicsContext,
    E: DecodeEngine,
    C: RefreshClock,
{
    pub(crate) fn new(
        config: SchedulerConfig,
        graphics: G,
        engine: E,
        clock: C,
        tx: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        Self {
            admission_limit: config.max_stream_limit,
            config,
            graphics,
            engine,
            clock,
            pipelines: HashMap::new(),
            bindings: HashMap::new(),
            pending_release: TimerSet::new(tx.clone(), |url, generation| Command::ReleaseDue {
                url,
                generation,
            }),
            pending_retry: TimerSet::new(tx.clone(), |url, generation| Command::RetryDue {
                url,
                generation,
            }),
            next_pipeline_id: 1,
            tick_registered: false,
            ticks: 0,
            last_tick: TickReport::default(),
            tx,
            shut_down: false,
        }
    }

    /// Drain the command queue until shutdown or until every handle is dropped
    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::info!(
            admission_limit = self.admission_limit,
            debounce_ms = self.config.release_debounce.as_millis() as u64,
            "Render scheduler started"
        );

        while let Some(command) = rx.recv().await {
            self.handle(command);
            if self.shut_down {
                break;
            }
        }

        self.shutdown();
        tracing::info!("Render scheduler stopped");
    }

    pub(crate) fn handle(&mut self, command: Command) {
        if self.shut_down {
            // Reply channels are dropped here, which callers observe as "no result"
            return;
        }

        match command {
            Command::Attach {
                url,
                surface,
                width,
                height,
                options,
            } => {
                if let Err(e) = self.attach(&url, surface, width, height, options) {
                    tracing::warn!(url = %url, surface = %surface, error = %e, "Attach rejected");
                }
            }
            Command::Detach { url, surface } => {
                if let Err(e) = self.detach(&url, surface) {
                    tracing::debug!(url = %url, surface = %surface, error = %e, "Detach ignored");
                }
            }
            Command::Resize {
                surface,
                width,
                height,
            } => self.resize(surface, width, height),
            Command::SetVisibility { surface, visible } => self.set_visibility(surface, visible),
            Command::Capture { surface, reply } => {
                let _ = reply.send(self.capture(surface));
            }
            Command::SetAdmissionLimit(limit) => self.set_admission_limit(limit),
            Command::Diagnostics { reply } => {
                let _ = reply.send(self.diagnostics());
            }
            Command::PrintDiagnostics => {
                tracing::info!("Scheduler diagnostics:\n{}", self.diagnostics());
            }
            Command::Shutdown { done } => {
                self.shutdown();
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            Command::Tick => {
                self.tick_registered = false;
                self.last_tick = self.tick();
            }
            Command::ReleaseDue { url, generation } => self.on_release_due(&url, generation),
            Command::RetryDue { url, generation } => self.on_retry_due(&url, generation),
            Command::Decode {
                url,
                pipeline,
                event,
            } => self.on_decode_event(&url, pipeline, event),
        }
    }

    /// Attach a surface to a source, creating the pipeline if needed
    pub(crate) fn attach(
        &mut self,
        url: &str,
        surface: SurfaceHandle,
        width: u32,
        height: u32,
        options: MediaOptions,
    ) -> Result<PipelineId> {
        if self.bindings.contains_key(&surface) {
            return Err(SchedulerError::SurfaceAlreadyBound(surface).into());
        }

        if self.pending_release.cancel(url) {
            tracing::info!(url = %url, surface = %surface, "Pipeline resurrected before release");
        }

        if !self.pipelines.contains_key(url) {
            if self.pipelines.len() >= self.admission_limit {
                return Err(SchedulerError::AdmissionRejected {
                    url: url.to_string(),
                    limit: self.admission_limit,
                }
                .into());
            }
            let pipeline = self.start_pipeline(url, options)?;
            self.pipelines.insert(url.to_string(), pipeline);
        }

        let mut binding = DisplayBinding::new(surface, url, width, height);
        if let Err(e) = binding.attach(&mut self.graphics) {
            // A freshly created pipeline may now have nobody to serve
            self.schedule_release_if_unbound(url);
            return Err(e.into());
        }
        self.bindings.insert(surface, binding);

        let live = self.pipelines.len();
        let Some(pipeline) = self.pipelines.get_mut(url) else {
            return Err(SchedulerError::UnknownSurface(surface).into());
        };
        pipeline.bind(surface);
        let id = pipeline.id();

        tracing::info!(
            url = %url,
            surface = %surface,
            pipeline = %id,
            width = width,
            height = height,
            bound = pipeline.bound().len(),
            live = live,
            "Surface attached"
        );

        self.apply_suspend_policy(url);
        self.request_tick();
        Ok(id)
    }

    fn start_pipeline(&mut self, url: &str, options: MediaOptions) -> Result<DecodePipeline<E::Session>> {
        let id = PipelineId(self.next_pipeline_id);
        self.next_pipeline_id += 1;

        let mut pipeline = DecodePipeline::new(
            id,
            url,
            options,
            self.config.frame_width,
            self.config.frame_height,
            self.config.retry_policy(),
        );
        let events = DecodeEventSink::new(pipeline.url_arc(), id, self.tx.clone());
        pipeline.start(&mut self.graphics, &mut self.engine, events)?;
        Ok(pipeline)
    }

    /// Detach a surface; the pipeline is released after the debounce window
    pub(crate) fn detach(&mut self, url: &str, surface: SurfaceHandle) -> Result<()> {
        let Some(mut binding) = self.bindings.remove(&surface) else {
            return Err(SchedulerError::UnknownSurface(surface).into());
        };
        binding.detach(&mut self.graphics);

        let source = binding.source().to_string();
        if source != url {
            tracing::warn!(
                url = %url,
                bound_to = %source,
                surface = %surface,
                "Detach URL does not match binding, using binding's source"
            );
        }

        let remaining = match self.pipelines.get_mut(&source) {
            Some(pipeline) => {
                pipeline.unbind(surface);
                pipeline.bound().len()
            }
            None => 0,
        };

        tracing::info!(url = %source, surface = %surface, remaining = remaining, "Surface detached");

        if remaining == 0 {
            self.schedule_release_if_unbound(&source);
        } else {
            self.apply_suspend_policy(&source);
        }
        Ok(())
    }

    fn schedule_release_if_unbound(&mut self, url: &str) {
        let unbound = self.pipelines.get(url).is_some_and(|p| !p.has_bound());
        if unbound && !self.pending_release.contains(url) {
            self.pending_release
                .schedule(url, self.config.release_debounce);
            tracing::debug!(
                url = %url,
                debounce_ms = self.config.release_debounce.as_millis() as u64,
                "Release scheduled"
            );
        }
    }

    fn on_release_due(&mut self, url: &str, generation: u64) {
        if !self.pending_release.fire(url, generation) {
            tracing::trace!(url = %url, "Stale release timer ignored");
            return;
        }

        // An attach may have landed since the timer was armed
        if self.pipelines.get(url).is_some_and(|p| p.has_bound()) {
            return;
        }

        if let Some(mut pipeline) = self.pipelines.remove(url) {
            self.pending_retry.cancel(url);
            pipeline.release(&mut self.graphics);
            tracing::info!(url = %url, live = self.pipelines.len(), "Idle pipeline removed");
        }
    }

    pub(crate) fn resize(&mut self, surface: SurfaceHandle, width: u32, height: u32) {
        match self.bindings.get_mut(&surface) {
            Some(binding) => binding.resize(width, height),
            None => tracing::debug!(surface = %surface, "Resize for unknown surface"),
        }
    }

    /// Move a surface in or out of its pipeline's active set
    pub(crate) fn set_visibility(&mut self, surface: SurfaceHandle, visible: bool) {
        let Some(source) = self.bindings.get(&surface).map(|b| b.source().to_string()) else {
            tracing::debug!(surface = %surface, "Visibility change for unknown surface");
            return;
        };

        let changed = self
            .pipelines
            .get_mut(&source)
            .is_some_and(|p| p.set_active(surface, visible));
        if !changed {
            return;
        }

        tracing::debug!(url = %source, surface = %surface, visible = visible, "Visibility changed");
        self.apply_suspend_policy(&source);
        if visible {
            self.request_tick();
        }
    }

    fn apply_suspend_policy(&mut self, url: &str) {
        if self.config.suspend_policy != SuspendPolicy::PauseDecoding {
            return;
        }

        let outcome = {
            let Some(pipeline) = self.pipelines.get_mut(url) else {
                return;
            };

            if pipeline.has_active() {
                if pipeline.state() != PipelineState::Paused {
                    return;
                }
                match pipeline.resume() {
                    Ok(()) => EventOutcome::None,
                    Err(e) => pipeline.handle_event(DecodeEvent::Error(e.to_string())),
                }
            } else {
                // With no bound surfaces the debounce owns the pipeline
                if pipeline.has_bound() {
                    pipeline.pause();
                }
                EventOutcome::None
            }
        };

        self.apply_outcome(url, outcome);
    }

    fn on_decode_event(&mut self, url: &str, id: PipelineId, event: DecodeEvent) {
        let outcome = match self.pipelines.get_mut(url) {
            Some(pipeline) if pipeline.id() == id => pipeline.handle_event(event),
            _ => {
                tracing::trace!(url = %url, pipeline = %id, "Event for stale pipeline dropped");
                return;
            }
        };
        self.apply_outcome(url, outcome);
    }

    fn on_retry_due(&mut self, url: &str, generation: u64) {
        if !self.pending_retry.fire(url, generation) {
            return;
        }
        let outcome = match self.pipelines.get_mut(url) {
            Some(pipeline) => pipeline.retry(),
            None => return,
        };
        self.apply_outcome(url, outcome);
    }

    fn apply_outcome(&mut self, url: &str, outcome: EventOutcome) {
        match outcome {
            EventOutcome::None => {}
            EventOutcome::RetryAfter(delay) => self.pending_retry.schedule(url, delay),
            EventOutcome::StreamDead => self.handle_dead_stream(url),
        }
    }

    /// Tear down a pipeline whose retry budget ran out, with all its surfaces
    fn handle_dead_stream(&mut self, url: &str) {
        let Some(mut pipeline) = self.pipelines.remove(url) else {
            return;
        };
        self.pending_release.cancel(url);
        self.pending_retry.cancel(url);

        let surfaces: Vec<SurfaceHandle> = pipeline.bound().iter().copied().collect();
        for surface in &surfaces {
            if let Some(mut binding) = self.bindings.remove(surface) {
                binding.detach(&mut self.graphics);
            }
            pipeline.unbind(*surface);
        }
        pipeline.release(&mut self.graphics);

        tracing::error!(
            url = %url,
            pipeline = %pipeline.id(),
            surfaces = surfaces.len(),
            "Stream dead, surfaces detached"
        );
    }

    /// Read back the last frame shown on a surface
    pub(crate) fn capture(&mut self, surface: SurfaceHandle) -> Option<FrameSnapshot> {
        let binding = self.bindings.get(&surface)?;
        let pipeline = self
            .pipelines
            .get(binding.source())
            .filter(|p| p.is_bound(surface))?;
        let (target, width, height) = pipeline.capture_source()?;

        match self.graphics.read_pixels(target, width, height) {
            Ok(pixels) => Some(FrameSnapshot {
                url: pipeline.url().to_string(),
                width,
                height,
                pixels,
            }),
            Err(e) => {
                tracing::warn!(surface = %surface, error = %e, "Capture read-back failed");
                None
            }
        }
    }

    pub(crate) fn set_admission_limit(&mut self, limit: usize) {
        tracing::info!(
            limit = limit,
            previous = self.admission_limit,
            live = self.pipelines.len(),
            "Admission limit changed"
        );
        self.admission_limit = limit;
    }

    pub(crate) fn diagnostics(&self) -> SchedulerDiagnostics {
        let mut pipelines: Vec<PipelineDiagnostics> = self
            .pipelines
            .iter()
            .map(|(url, p)| PipelineDiagnostics {
                url: url.clone(),
                id: p.id(),
                state: p.state(),
                is_decoding: p.is_decoding(),
                active: p.active().len(),
                bound: p.bound().len(),
                pending_release: self.pending_release.contains(url),
                pending_retry: self.pending_retry.contains(url),
                retry_count: p.retry_count(),
                frames_rendered: p.frames_rendered(),
            })
            .collect();
        pipelines.sort_by(|a, b| a.url.cmp(&b.url));

        SchedulerDiagnostics {
            pipelines,
            bindings: self.bindings.len(),
            admission_limit: self.admission_limit,
            tick_running: self.tick_registered,
            ticks: self.ticks,
            last_tick: self.last_tick,
        }
    }

    /// Release everything; safe to call repeatedly
    pub(crate) fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let timers = self.pending_release.len() + self.pending_retry.len();
        self.pending_release.cancel_all();
        self.pending_retry.cancel_all();

        let pipelines = self.pipelines.len();
        for (_, mut pipeline) in self.pipelines.drain() {
            pipeline.release(&mut self.graphics);
        }
        let bindings = self.bindings.len();
        for (_, mut binding) in self.bindings.drain() {
            binding.detach(&mut self.graphics);
        }

        self.clock.cancel();
        self.tick_registered = false;
        self.graphics.teardown();

        tracing::info!(
            pipelines = pipelines,
            bindings = bindings,
            timers = timers,
            "Scheduler shut down"
        );
    }
}
