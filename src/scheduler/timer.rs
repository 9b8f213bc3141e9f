//! Cancelable per-URL timers
//!
//! A timer is a sleeping task that posts an expiry command back into the
//! scheduler queue. Aborting the task is not enough on its own: the expiry
//! may already be queued. Every timer therefore carries a generation, and an
//! expiry is honoured only if its generation is still the current one for
//! that URL. Cancellation is thus synchronous with respect to the queue.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::command::Command;

struct PendingTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Set of timers keyed by source URL
pub(crate) struct TimerSet {
    timers: HashMap<String, PendingTimer>,
    next_generation: u64,
    tx: mpsc::WeakUnboundedSender<Command>,
    expiry: fn(String, u64) -> Command,
}

impl TimerSet {
    pub(crate) fn new(tx: mpsc::WeakUnboundedSender<Command>, expiry: fn(String, u64) -> Command) -> Self {
        Self {
            timers: HashMap::new(),
            next_generation: 1,
            tx,
            expiry,
        }
    }

    /// Arm a timer for `url`, replacing any existing one
    pub(crate) fn schedule(&mut self, url: &str, delay: Duration) {
        self.cancel(url);

        let generation = self.next_generation;
        self.next_generation += 1;

        let tx = self.tx.clone();
        let command = (self.expiry)(url.to_string(), generation);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(command);
            }
        });

        self.timers
            .insert(url.to_string(), PendingTimer { generation, handle });
    }

    /// Cancel the timer for `url`; returns true if one was pending
    pub(crate) fn cancel(&mut self, url: &str) -> bool {
        match self.timers.remove(url) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Consume an expiry; returns false if it is stale
    pub(crate) fn fire(&mut self, url: &str, generation: u64) -> bool {
        match self.timers.get(url) {
            Some(timer) if timer.generation == generation => {
                self.timers.remove(url);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn contains(&self, url: &str) -> bool {
        self.timers.contains_key(url)
    }

    pub(crate) fn len(&self) -> usize {
        self.timers.len()
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.handle.abort();
        }
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(url: String, generation: u64) -> Command {
        Command::ReleaseDue { url, generation }
    }

    fn expect_release(cmd: Command) -> (String, u64) {
        match cmd {
            Command::ReleaseDue { url, generation } => (url, generation),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_posted() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new(tx.downgrade(), release);

        timers.schedule("a", Duration::from_millis(500));
        assert!(timers.contains("a"));

        let (url, generation) = expect_release(rx.recv().await.unwrap());
        assert_eq!(url, "a");
        assert!(timers.fire(&url, generation));
        assert!(!timers.contains("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_expiry_is_stale() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new(tx.downgrade(), release);

        timers.schedule("a", Duration::from_millis(10));
        // Let the expiry reach the queue before cancelling
        let (url, generation) = expect_release(rx.recv().await.unwrap());

        assert!(timers.cancel("a"));
        assert!(!timers.fire(&url, generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_invalidates_previous() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new(tx.downgrade(), release);

        timers.schedule("a", Duration::from_millis(10));
        let (_, first) = expect_release(rx.recv().await.unwrap());

        timers.schedule("a", Duration::from_millis(10));
        let (_, second) = expect_release(rx.recv().await.unwrap());

        assert!(!timers.fire("a", first));
        assert!(timers.fire("a", second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
        let mut timers = TimerSet::new(tx.downgrade(), release);

        timers.schedule("a", Duration::from_millis(10));
        timers.schedule("b", Duration::from_millis(10));
        assert_eq!(timers.len(), 2);

        timers.cancel_all();
        assert_eq!(timers.len(), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }
}
