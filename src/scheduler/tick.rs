//! Render tick
//!
//! One tick runs per refresh signal while any pipeline has a visible surface.
//! Phase 1 pulls fresh frames into each pipeline's off-screen target, phase 2
//! fans those frames out to every active surface. Failures are contained per
//! pipeline and per surface.

use crate::clock::RefreshClock;
use crate::decode::DecodeEngine;
use crate::error::GraphicsError;
use crate::graphics::{
    BindTarget, GraphicsContext, OffscreenTarget, RenderTargetHandle, SurfaceHandle, TextureId,
    Transform,
};

use super::actor::StreamRenderScheduler;
use super::command::Command;

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Pipelines that produced a fresh off-screen frame
    pub frames_rendered: usize,
    /// Surfaces that were drawn and presented
    pub surfaces_presented: usize,
    /// Surfaces skipped because their render target was unusable
    pub surfaces_skipped: usize,
    /// Per-pipeline or per-surface failures that were logged and contained
    pub failures: usize,
    /// Whether another tick was requested
    pub continued: bool,
}

impl<G, E, C> StreamRenderScheduler<G, E, C>
where
    G: GraphicsContext,
    E: DecodeEngine,
    C: RefreshClock,
{
    /// Register for the next refresh unless a registration is outstanding
    pub(crate) fn request_tick(&mut self) {
        if self.tick_registered || self.shut_down {
            return;
        }

        let tx = self.tx.clone();
        self.clock.post_next_tick(Box::new(move || {
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::Tick);
            }
        }));
        self.tick_registered = true;
    }

    pub(crate) fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport::default();

        let refreshed = self.render_pipelines(&mut report);
        self.present(&refreshed, &mut report);

        let any_active = self.pipelines.values().any(|p| p.has_active());
        if any_active {
            self.request_tick();
            report.continued = true;
        } else {
            if let Err(e) = self.graphics.bind(BindTarget::Shared) {
                tracing::warn!(error = %e, "Failed to park shared context");
            }
            tracing::debug!(ticks = self.ticks, "Render loop idle");
        }

        if report.failures > 0 {
            tracing::debug!(
                tick = self.ticks,
                frames = report.frames_rendered,
                presented = report.surfaces_presented,
                failures = report.failures,
                "Tick completed with failures"
            );
        }
        report
    }

    /// Phase 1: latch pending frames and draw them off-screen
    fn render_pipelines(&mut self, report: &mut TickReport) -> Vec<(OffscreenTarget, Vec<SurfaceHandle>)> {
        let mut refreshed = Vec::new();

        let needs_context = self
            .pipelines
            .values()
            .any(|p| p.has_active() && p.has_pending_frame());
        if !needs_context {
            return refreshed;
        }

        if let Err(e) = self.graphics.bind(BindTarget::Shared) {
            tracing::warn!(error = %e, "Failed to bind shared context");
            report.failures += 1;
            return refreshed;
        }

        for pipeline in self.pipelines.values_mut() {
            if !pipeline.has_active() {
                continue;
            }
            match pipeline.render_frame(&mut self.graphics) {
                Ok(true) => {
                    report.frames_rendered += 1;
                    if let Some(target) = pipeline.offscreen() {
                        let mut surfaces: Vec<SurfaceHandle> = pipeline.active().iter().copied().collect();
                        surfaces.sort();
                        refreshed.push((target, surfaces));
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(
                        url = %pipeline.url(),
                        pipeline = %pipeline.id(),
                        error = %e,
                        "Frame render failed"
                    );
                }
            }
        }
        refreshed
    }

    /// Phase 2: draw fresh off-screen frames into every active surface
    fn present(&mut self, refreshed: &[(OffscreenTarget, Vec<SurfaceHandle>)], report: &mut TickReport) {
        for (source, surfaces) in refreshed {
            for surface in surfaces {
                let Some(binding) = self.bindings.get_mut(surface) else {
                    continue;
                };
                let Some(target) = binding.render_target() else {
                    report.surfaces_skipped += 1;
                    continue;
                };
                if !self.graphics.is_render_target_valid(target) {
                    tracing::trace!(surface = %surface, "Render target unusable, skipped");
                    report.surfaces_skipped += 1;
                    continue;
                }

                binding.transform = Transform::IDENTITY;
                let (width, height) = binding.size();

                let drawn = draw_surface(
                    &mut self.graphics,
                    source.texture,
                    target,
                    &binding.transform,
                    width,
                    height,
                );

                match drawn {
                    Ok(()) => report.surfaces_presented += 1,
                    Err(e) => {
                        report.failures += 1;
                        tracing::warn!(surface = %surface, error = %e, "Surface present failed");
                    }
                }
            }
        }
    }
}

fn draw_surface<G: GraphicsContext>(
    gfx: &mut G,
    texture: TextureId,
    target: RenderTargetHandle,
    transform: &Transform,
    width: u32,
    height: u32,
) -> Result<(), GraphicsError> {
    let dst = BindTarget::Surface(target);
    gfx.bind(dst)?;
    gfx.set_swap_interval(0);
    gfx.blit(texture, dst, transform, width, height)?;
    gfx.swap_buffers(target)
}
