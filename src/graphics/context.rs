//! Graphics context contract
//!
//! The scheduler only drives this trait; it never reimplements GPU plumbing.
//! Implementations have single-thread affinity: every call is made from the
//! scheduler's execution context.

use bytes::Bytes;

use crate::error::GraphicsError;

use super::handle::{
    OffscreenTarget, RenderTargetHandle, SurfaceHandle, TextureId, Transform,
};

/// What the shared context is bound to, or what a blit draws into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindTarget {
    /// The shared context's own default target (pbuffer or equivalent)
    Shared,
    /// A pipeline's off-screen target
    Offscreen(OffscreenTarget),
    /// A display surface's render target
    Surface(RenderTargetHandle),
}

/// Operations the scheduler needs from the shared rendering context
pub trait GraphicsContext {
    /// Allocate an off-screen framebuffer with a color texture of the given size
    fn create_offscreen_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<OffscreenTarget, GraphicsError>;

    /// Destroy an off-screen target and its texture
    fn destroy_offscreen_target(&mut self, target: OffscreenTarget);

    /// Allocate a texture that an external producer (the decoder) can stream into
    fn create_external_texture(&mut self) -> Result<TextureId, GraphicsError>;

    /// Destroy a texture
    fn destroy_texture(&mut self, texture: TextureId);

    /// Create a render target for an external display surface
    fn create_render_target(
        &mut self,
        surface: SurfaceHandle,
    ) -> Result<RenderTargetHandle, GraphicsError>;

    /// Destroy a render target
    fn destroy_render_target(&mut self, target: RenderTargetHandle);

    /// Check whether a render target can still be drawn to
    ///
    /// Host surfaces may be torn down between ticks; a `false` here means
    /// "skip this tick", never an error.
    fn is_render_target_valid(&self, target: RenderTargetHandle) -> bool;

    /// Make the context current on a target
    fn bind(&mut self, target: BindTarget) -> Result<(), GraphicsError>;

    /// Draw `src` into `dst` with the given texture transform and viewport size
    fn blit(
        &mut self,
        src: TextureId,
        dst: BindTarget,
        transform: &Transform,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError>;

    /// Present a surface's back buffer
    fn swap_buffers(&mut self, target: RenderTargetHandle) -> Result<(), GraphicsError>;

    /// Set the swap interval for the bound target (0 = present immediately)
    fn set_swap_interval(&mut self, interval: u32);

    /// Read back RGBA8 pixels from an off-screen target
    fn read_pixels(
        &mut self,
        target: OffscreenTarget,
        width: u32,
        height: u32,
    ) -> Result<Bytes, GraphicsError>;

    /// Tear down the shared context
    fn teardown(&mut self);
}
