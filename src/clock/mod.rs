//! Hardware refresh clock boundary
//!
//! The render tick is driven by one-shot registrations: the scheduler posts a
//! callback, the clock fires it once on the next display refresh, and the
//! scheduler decides whether to register again.

pub mod interval;

pub use interval::IntervalClock;

/// Callback fired once on the next refresh
pub type TickCallback = Box<dyn FnOnce() + Send + 'static>;

/// Source of display refresh signals
pub trait RefreshClock {
    /// Register a callback for the next refresh
    fn post_next_tick(&mut self, callback: TickCallback);

    /// Drop any outstanding registration
    fn cancel(&mut self);
}
