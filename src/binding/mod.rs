//! Per-surface display bindings

pub mod display;

pub use display::DisplayBinding;
