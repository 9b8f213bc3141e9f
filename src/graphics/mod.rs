//! Graphics context boundary
//!
//! Opaque handle types plus the [`GraphicsContext`] trait that any concrete
//! graphics API (EGL/GLES, wgpu, Metal) implements for the scheduler.

pub mod context;
pub mod handle;

pub use context::{BindTarget, GraphicsContext};
pub use handle::{
    Allocation, FramebufferId, OffscreenTarget, RenderTargetHandle, SurfaceHandle, TextureId,
    Transform,
};
