//! Stream render scheduler
//!
//! Owns the decode pipelines (keyed by source URL) and the display bindings
//! (keyed by surface), ties them together, and drives the refresh-clocked
//! render tick that fans decoded frames out to every visible surface.
//!
//! # Architecture
//!
//! ```text
//!   [Host threads]             [Decode engine threads]      [Refresh clock]
//!   SchedulerHandle            DecodeEventSink::emit()      post_next_tick()
//!        │                     FrameSignal::notify()              │
//!        │                            │                           │
//!        ▼                            ▼                           ▼
//!   ┌──────────────────── mpsc::UnboundedSender<Command> ────────────────────┐
//!   └────────────────────────────────┬───────────────────────────────────────┘
//!                                    │ FIFO
//!                                    ▼
//!                        StreamRenderScheduler (one task)
//!                   ┌──────────────────────────────────────┐
//!                   │ pipelines: HashMap<Url, Pipeline {   │
//!                   │   session, offscreen, bound, active  │
//!                   │ }>                                   │
//!                   │ bindings: HashMap<Surface, Binding>  │
//!                   │ pending_release / pending_retry      │
//!                   └──────────────────┬───────────────────┘
//!                                      │
//!                     tick: latch ──► offscreen ──► blit ──► swap
//!                                      │
//!                                      ▼
//!                               GraphicsContext
//! ```
//!
//! # Release debounce
//!
//! When a pipeline loses its last surface it is not released at once: a
//! release timer is armed, and an attach for the same URL inside the window
//! cancels it. A surface list that detaches and re-attaches on every layout
//! pass therefore never restarts the stream.

pub mod actor;
pub(crate) mod command;
pub mod config;
pub mod diagnostics;
pub mod handle;
pub mod tick;
mod timer;

pub use actor::StreamRenderScheduler;
pub use config::{ContextInfo, SchedulerConfig, SuspendPolicy};
pub use diagnostics::{FrameSnapshot, PipelineDiagnostics, SchedulerDiagnostics};
pub use handle::{SchedulerHandle, SchedulerThread};
pub use tick::TickReport;
