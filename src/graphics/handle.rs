//! Opaque GPU and surface handles
//!
//! The scheduler never interprets these values; they are minted by the
//! graphics context and handed back to it.

use std::fmt;

/// Identity of an external display surface owned by the host UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub u64);

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Per-surface render target created from a [`SurfaceHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle(pub u64);

/// Texture name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Off-screen framebuffer name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

/// Off-screen target: a framebuffer and the texture backing its color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffscreenTarget {
    /// Framebuffer to draw into
    pub framebuffer: FramebufferId,
    /// Texture holding the rendered frame
    pub texture: TextureId,
}

/// Explicit allocation state for a GPU handle
///
/// Every use site has to match on it, so a handle is never used before it
/// has been created or after it has been destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation<T> {
    /// Not created yet, or already destroyed
    Unallocated,
    /// Live handle
    Allocated(T),
}

impl<T: Copy> Allocation<T> {
    /// Get the handle if allocated
    pub fn get(&self) -> Option<T> {
        match self {
            Allocation::Allocated(handle) => Some(*handle),
            Allocation::Unallocated => None,
        }
    }

    /// Check if the handle is live
    pub fn is_allocated(&self) -> bool {
        matches!(self, Allocation::Allocated(_))
    }

    /// Reset to unallocated, returning the handle that was held
    pub fn take(&mut self) -> Option<T> {
        std::mem::replace(self, Allocation::Unallocated).get()
    }
}

impl<T> Default for Allocation<T> {
    fn default() -> Self {
        Allocation::Unallocated
    }
}

/// Column-major 4x4 texture transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(pub [f32; 16]);

impl Transform {
    /// Identity transform
    pub const IDENTITY: Transform = Transform([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_take() {
        let mut slot = Allocation::Allocated(TextureId(3));
        assert!(slot.is_allocated());

        assert_eq!(slot.take(), Some(TextureId(3)));
        assert_eq!(slot, Allocation::Unallocated);

        // Second take is a no-op
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_surface_display() {
        assert_eq!(SurfaceHandle(42).to_string(), "surface#42");
    }

    #[test]
    fn test_default_transform_is_identity() {
        assert_eq!(Transform::default(), Transform::IDENTITY);
        assert_eq!(Transform::IDENTITY.0[0], 1.0);
        assert_eq!(Transform::IDENTITY.0[15], 1.0);
    }
}
