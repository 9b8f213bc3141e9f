//! Decode engine boundary
//!
//! This module provides:
//! - The [`DecodeEngine`] / [`DecodeSession`] traits a native engine implements
//! - Ordered [`MediaOptions`] passed to each session
//! - Event and frame signalling from engine threads into the scheduler

pub mod engine;
pub mod event;

pub use engine::{DecodeEngine, DecodeSession, MediaOptions, SessionOutput};
pub use event::{DecodeEvent, DecodeEventSink, FrameSignal};
