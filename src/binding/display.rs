//! Display binding
//!
//! Plain data holder for one host surface: its render target, physical size
//! and the scratch transform used when drawing into it.

use crate::error::GraphicsError;
use crate::graphics::{Allocation, GraphicsContext, RenderTargetHandle, SurfaceHandle, Transform};

/// One external display surface attached to a source
#[derive(Debug)]
pub struct DisplayBinding {
    surface: SurfaceHandle,
    source: String,
    render_target: Allocation<RenderTargetHandle>,
    width: u32,
    height: u32,
    /// Scratch transform, recomputed every tick
    pub transform: Transform,
}

impl DisplayBinding {
    /// Create a binding; the render target is allocated by [`attach`](Self::attach)
    pub fn new(surface: SurfaceHandle, source: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            surface,
            source: source.into(),
            render_target: Allocation::Unallocated,
            width,
            height,
            transform: Transform::IDENTITY,
        }
    }

    /// Allocate the render target for the surface (no-op if already allocated)
    pub fn attach<G: GraphicsContext>(&mut self, gfx: &mut G) -> Result<(), GraphicsError> {
        if self.render_target.is_allocated() {
            return Ok(());
        }
        let target = gfx.create_render_target(self.surface)?;
        self.render_target = Allocation::Allocated(target);
        Ok(())
    }

    /// Destroy the render target (no-op if not allocated)
    pub fn detach<G: GraphicsContext>(&mut self, gfx: &mut G) {
        if let Some(target) = self.render_target.take() {
            gfx.destroy_render_target(target);
        }
    }

    /// Update the physical size; takes effect on the next tick
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn surface(&self) -> SurfaceHandle {
        self.surface
    }

    /// URL of the source this surface shows
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render_target(&self) -> Option<RenderTargetHandle> {
        self.render_target.get()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
