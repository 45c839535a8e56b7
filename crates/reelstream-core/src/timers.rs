//! Cancellable one-shot timers for the session controller
//!
//! Each timer kind has at most one pending instance. Scheduling a kind again
//! aborts the previous task, and every firing carries a generation number so
//! a firing that raced its own cancellation is recognised as stale.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Timer kinds owned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Scheduled reload after a retryable error
    Retry,
    /// Fallback that clears Buffering without a readiness callback
    BufferingTimeout,
    /// Fallback that completes a quality switch without a readiness callback
    SwitchTimeout,
}

/// A timer that elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Set of pending timers delivering into a channel
pub struct TimerSet<E> {
    tx: mpsc::UnboundedSender<E>,
    wrap: fn(TimerFired) -> E,
    pending: HashMap<TimerKind, (u64, JoinHandle<()>)>,
    next_generation: u64,
}

impl<E: Send + 'static> TimerSet<E> {
    pub fn new(tx: mpsc::UnboundedSender<E>, wrap: fn(TimerFired) -> E) -> Self {
        Self {
            tx,
            wrap,
            pending: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Schedule `kind` after `delay`, superseding any pending instance
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration) -> u64 {
        self.cancel(kind);
        self.next_generation += 1;
        let generation = self.next_generation;

        let tx = self.tx.clone();
        let event = (self.wrap)(TimerFired { kind, generation });
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the controller was dropped
            let _ = tx.send(event);
        });

        debug!(?kind, generation, delay_ms = delay.as_millis() as u64, "Timer scheduled");
        self.pending.insert(kind, (generation, handle));
        generation
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        if let Some((generation, handle)) = self.pending.remove(&kind) {
            handle.abort();
            debug!(?kind, generation, "Timer cancelled");
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, (_, handle)) in self.pending.drain() {
            handle.abort();
        }
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.pending.contains_key(&kind)
    }

    /// Accept a firing if it is the live instance of its kind
    pub fn take_fired(&mut self, fired: TimerFired) -> bool {
        match self.pending.get(&fired.kind) {
            Some((generation, _)) if *generation == fired.generation => {
                self.pending.remove(&fired.kind);
                true
            }
            _ => {
                debug!(kind = ?fired.kind, generation = fired.generation, "Stale timer ignored");
                false
            }
        }
    }
}

impl<E> Drop for TimerSet<E> {
    fn drop(&mut self) {
        for (_, (_, handle)) in self.pending.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new(tx, |fired| fired);

        let generation = timers.schedule(TimerKind::Retry, Duration::from_secs(3));
        let fired = rx.recv().await.unwrap();

        assert_eq!(fired, TimerFired { kind: TimerKind::Retry, generation });
        assert!(timers.take_fired(fired));
        assert!(!timers.is_pending(TimerKind::Retry));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_supersedes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new(tx, |fired| fired);

        let first = timers.schedule(TimerKind::SwitchTimeout, Duration::from_secs(1));
        let second = timers.schedule(TimerKind::SwitchTimeout, Duration::from_secs(2));
        assert_ne!(first, second);

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.generation, second);
        assert!(timers.take_fired(fired));
        assert!(!timers.take_fired(TimerFired { kind: TimerKind::SwitchTimeout, generation: first }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_stops_delivery() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new(tx, |fired| fired);

        timers.schedule(TimerKind::Retry, Duration::from_secs(1));
        timers.schedule(TimerKind::BufferingTimeout, Duration::from_secs(1));
        timers.cancel_all();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
