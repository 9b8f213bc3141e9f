//! Decode pipelines
//!
//! A pipeline wraps one source URL: a decode session, the GPU resources the
//! session renders through, the bound/active surface sets, and a bounded
//! retry state machine for transient failures.
//!
//! ```text
//!   Idle ──start──► Starting ──Playing──► Playing ──EndReached──► Ended
//!                     ▲   │                  │
//!          retry due  │   └──Error──┐ ┌──Error┘
//!                     │             ▼ ▼
//!                     └────────── Error ──budget exhausted──► Dead
//!
//!   any ──release──► Released
//! ```

pub mod entry;
pub mod state;

pub use entry::DecodePipeline;
pub use state::{EventOutcome, PipelineId, PipelineState, RetryPolicy};
