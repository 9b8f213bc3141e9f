//! Error types
//!
//! Failures are contained at the component that detects them. Transient
//! decode errors never leave the pipeline state machine and nothing escapes a
//! render tick; the types here describe what collaborators report and why an
//! attach was refused.

use std::fmt;

use crate::graphics::SurfaceHandle;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Scheduler-level rejection
    Scheduler(SchedulerError),
    /// Decode engine failure
    Decode(DecodeError),
    /// Graphics context failure
    Graphics(GraphicsError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Scheduler(e) => write!(f, "Scheduler error: {}", e),
            Error::Decode(e) => write!(f, "Decode error: {}", e),
            Error::Graphics(e) => write!(f, "Graphics error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Scheduler(e) => Some(e),
            Error::Decode(e) => Some(e),
            Error::Graphics(e) => Some(e),
        }
    }
}

impl From<SchedulerError> for Error {
    fn from(e: SchedulerError) -> Self {
        Error::Scheduler(e)
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl From<GraphicsError> for Error {
    fn from(e: GraphicsError) -> Self {
        Error::Graphics(e)
    }
}

/// Reasons the scheduler refuses or cannot carry out a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A new source was requested while the live pipeline count is at the limit
    AdmissionRejected {
        /// Source that was refused
        url: String,
        /// Admission limit in force at the time
        limit: usize,
    },
    /// The surface is already attached to a source
    SurfaceAlreadyBound(SurfaceHandle),
    /// No binding exists for the surface
    UnknownSurface(SurfaceHandle),
    /// The scheduler has shut down or its task is gone
    Closed,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::AdmissionRejected { url, limit } => {
                write!(f, "Admission rejected for {} (limit {})", url, limit)
            }
            SchedulerError::SurfaceAlreadyBound(surface) => {
                write!(f, "Surface already bound: {}", surface)
            }
            SchedulerError::UnknownSurface(surface) => write!(f, "Unknown surface: {}", surface),
            SchedulerError::Closed => write!(f, "Scheduler closed"),
        }
    }
}

impl std::error::Error for SchedulerError {}

/// Errors reported by the decode engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The engine could not create a session
    Session(String),
    /// Opening the source failed
    Open(String),
    /// Playback could not be started
    Playback(String),
    /// Latching a frame into the intermediate texture failed
    Latch(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Session(msg) => write!(f, "session creation failed: {}", msg),
            DecodeError::Open(msg) => write!(f, "open failed: {}", msg),
            DecodeError::Playback(msg) => write!(f, "playback failed: {}", msg),
            DecodeError::Latch(msg) => write!(f, "frame latch failed: {}", msg),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors reported by the graphics context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// A target or texture could not be allocated
    Allocation(String),
    /// The render target is no longer usable
    InvalidTarget,
    /// Binding a target failed
    Bind(String),
    /// Draw or blit failed
    Draw(String),
    /// Buffer swap failed
    Swap(String),
    /// Pixel read-back failed
    ReadBack(String),
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::Allocation(msg) => write!(f, "allocation failed: {}", msg),
            GraphicsError::InvalidTarget => write!(f, "render target invalid"),
            GraphicsError::Bind(msg) => write!(f, "bind failed: {}", msg),
            GraphicsError::Draw(msg) => write!(f, "draw failed: {}", msg),
            GraphicsError::Swap(msg) => write!(f, "swap failed: {}", msg),
            GraphicsError::ReadBack(msg) => write!(f, "read-back failed: {}", msg),
        }
    }
}

impl std::error::Error for GraphicsError {}
