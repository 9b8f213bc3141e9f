//! Timer-driven refresh clock
//!
//! Stands in for a vsync source on hosts that don't expose one. Deadlines are
//! kept on a fixed cadence so a slow tick doesn't shift every later frame.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use super::{RefreshClock, TickCallback};

/// Refresh clock firing at a fixed interval
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct IntervalClock {
    interval: Duration,
    next_deadline: Option<Instant>,
    pending: Option<JoinHandle<()>>,
}

impl IntervalClock {
    /// Create a clock with the given refresh interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_deadline: None,
            pending: None,
        }
    }

    /// Create a clock for a refresh rate in Hz
    pub fn from_hz(hz: u32) -> Self {
        Self::new(Duration::from_nanos(1_000_000_000 / u64::from(hz.max(1))))
    }

    /// Get the refresh interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn advance_deadline(&mut self) -> Instant {
        let now = Instant::now();
        let deadline = match self.next_deadline {
            // Resync if we fell behind by more than a frame
            Some(next) if next + self.interval > now => next + self.interval,
            _ => now + self.interval,
        };
        self.next_deadline = Some(deadline);
        deadline
    }
}

impl Default for IntervalClock {
    fn default() -> Self {
        Self::from_hz(60)
    }
}

impl RefreshClock for IntervalClock {
    fn post_next_tick(&mut self, callback: TickCallback) {
        let deadline = self.advance_deadline();

        self.pending = Some(tokio::spawn(async move {
            time::sleep_until(deadline).await;
            callback();
        }));
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.next_deadline = None;
    }
}

impl Drop for IntervalClock {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_from_hz() {
        let clock = IntervalClock::from_hz(50);
        assert_eq!(clock.interval(), Duration::from_millis(20));

        // Zero is clamped rather than dividing by zero
        let clock = IntervalClock::from_hz(0);
        assert_eq!(clock.interval(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_registration() {
        let mut clock = IntervalClock::new(Duration::from_millis(16));
        let fired = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&fired);
        clock.post_next_tick(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_registration() {
        let mut clock = IntervalClock::new(Duration::from_millis(16));
        let fired = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&fired);
        clock.post_next_tick(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        clock.cancel();

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
