//! Multi-stream video render scheduler
//!
//! `surfacemux` decodes many live streams at once and draws each one into any
//! number of host display surfaces. One decode pipeline serves every surface
//! showing the same URL, a single refresh-clocked tick pulls fresh frames
//! and fans them out, and attach/detach churn from the UI is absorbed by a
//! debounced release so streams are not restarted on every layout pass.
//!
//! The decoder, the graphics API and the refresh clock are supplied by the
//! host through the [`DecodeEngine`], [`GraphicsContext`] and
//! [`RefreshClock`] traits.
//!
//! # Example
//!
//! ```ignore
//! use surfacemux::{MediaOptions, SchedulerConfig, StreamRenderScheduler, SurfaceHandle};
//!
//! let config = SchedulerConfig::default().max_stream_limit(4);
//! let scheduler = StreamRenderScheduler::spawn_dedicated(config, |config| {
//!     let graphics = EglContext::new(&config.context)?;
//!     let engine = VlcEngine::new(&config.engine_args)?;
//!     let clock = Choreographer::new();
//!     Ok((graphics, engine, clock))
//! })?;
//!
//! let handle = scheduler.handle();
//! handle.attach("rtsp://cam/1", SurfaceHandle(1), 640, 360, MediaOptions::low_latency())?;
//! // ...
//! scheduler.join()?;
//! ```

pub mod binding;
pub mod clock;
pub mod decode;
pub mod error;
pub mod graphics;
pub mod pipeline;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use binding::DisplayBinding;
pub use clock::{IntervalClock, RefreshClock};
pub use decode::{DecodeEngine, DecodeEvent, DecodeEventSink, DecodeSession, MediaOptions};
pub use error::{DecodeError, Error, GraphicsError, Result, SchedulerError};
pub use graphics::{GraphicsContext, SurfaceHandle};
pub use pipeline::{PipelineId, PipelineState};
pub use scheduler::{
    FrameSnapshot, SchedulerConfig, SchedulerDiagnostics, SchedulerHandle, SchedulerThread,
    StreamRenderScheduler, SuspendPolicy,
};
