//! Commands processed by the scheduler task
//!
//! Host requests, refresh ticks, timer expiries and decode events all arrive
//! through one FIFO channel, which gives a total order over every state
//! change.

use tokio::sync::oneshot;

use crate::decode::{DecodeEvent, MediaOptions};
use crate::graphics::SurfaceHandle;
use crate::pipeline::PipelineId;

use super::diagnostics::{FrameSnapshot, SchedulerDiagnostics};

#[derive(Debug)]
pub enum Command {
    Attach {
        url: String,
        surface: SurfaceHandle,
        width: u32,
        height: u32,
        options: MediaOptions,
    },
    Detach {
        url: String,
        surface: SurfaceHandle,
    },
    Resize {
        surface: SurfaceHandle,
        width: u32,
        height: u32,
    },
    SetVisibility {
        surface: SurfaceHandle,
        visible: bool,
    },
    Capture {
        surface: SurfaceHandle,
        reply: oneshot::Sender<Option<FrameSnapshot>>,
    },
    SetAdmissionLimit(usize),
    Diagnostics {
        reply: oneshot::Sender<SchedulerDiagnostics>,
    },
    PrintDiagnostics,
    Shutdown {
        done: Option<oneshot::Sender<()>>,
    },

    /// Refresh signal from the clock
    Tick,
    /// Debounce window for `url` expired
    ReleaseDue {
        url: String,
        generation: u64,
    },
    /// Retry backoff for `url` expired
    RetryDue {
        url: String,
        generation: u64,
    },
    /// Lifecycle event from a decode session
    Decode {
        url: String,
        pipeline: PipelineId,
        event: DecodeEvent,
    },
}
