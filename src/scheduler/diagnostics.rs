//! Diagnostics and capture results

use std::fmt;

use bytes::Bytes;

use crate::pipeline::{PipelineId, PipelineState};

use super::tick::TickReport;

/// RGBA8 read-back of a pipeline's last rendered frame
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// Source the frame came from
    pub url: String,
    /// Frame width (decode resolution)
    pub width: u32,
    /// Frame height (decode resolution)
    pub height: u32,
    /// Tightly packed RGBA8 pixels
    pub pixels: Bytes,
}

/// Per-pipeline statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDiagnostics {
    /// Source URL
    pub url: String,
    /// Pipeline identity
    pub id: PipelineId,
    /// Current state
    pub state: PipelineState,
    /// Whether the session is expected to produce frames
    pub is_decoding: bool,
    /// Surfaces eligible to receive frames
    pub active: usize,
    /// Surfaces attached
    pub bound: usize,
    /// Whether a debounced release is pending
    pub pending_release: bool,
    /// Whether a retry is pending
    pub pending_retry: bool,
    /// Consecutive errors since the last successful start
    pub retry_count: u32,
    /// Frames rendered into the off-screen target
    pub frames_rendered: u64,
}

/// Scheduler-wide statistics
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchedulerDiagnostics {
    /// Live pipelines, sorted by URL
    pub pipelines: Vec<PipelineDiagnostics>,
    /// Registered display bindings
    pub bindings: usize,
    /// Admission limit in force
    pub admission_limit: usize,
    /// Whether a refresh registration is outstanding
    pub tick_running: bool,
    /// Ticks executed since start
    pub ticks: u64,
    /// Outcome of the most recent tick
    pub last_tick: TickReport,
}

impl SchedulerDiagnostics {
    /// Number of live pipelines
    pub fn live(&self) -> usize {
        self.pipelines.len()
    }

    /// Look up a pipeline by URL
    pub fn pipeline(&self, url: &str) -> Option<&PipelineDiagnostics> {
        self.pipelines.iter().find(|p| p.url == url)
    }
}

impl fmt::Display for SchedulerDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "pipelines={}/{} bindings={} tick={} ticks={}",
            self.live(),
            self.admission_limit,
            self.bindings,
            if self.tick_running { "running" } else { "stopped" },
            self.ticks
        )?;
        for p in &self.pipelines {
            writeln!(
                f,
                "  {} [{}] state={} decoding={} active={}/{} pending_release={} retries={} frames={}",
                p.url,
                p.id,
                p.state,
                p.is_decoding,
                p.active,
                p.bound,
                p.pending_release,
                p.retry_count,
                p.frames_rendered
            )?;
        }
        Ok(())
    }
}
