//! Global atomic counters for prefix-sync invocations.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (the entry point does so once per invocation).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters. No allocations and no locking.
pub struct Metrics {
    events_received: AtomicU64,
    events_skipped: AtomicU64,
    mutations_applied: AtomicU64,
    version_conflicts: AtomicU64,
    fatal_errors: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_skipped: AtomicU64::new(0),
            mutations_applied: AtomicU64::new(0),
            version_conflicts: AtomicU64::new(0),
            fatal_errors: AtomicU64::new(0),
        }
    }

    pub fn inc_events_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "events_received", "counter incremented");
    }

    pub fn inc_events_skipped(&self) {
        self.events_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "events_skipped", "counter incremented");
    }

    pub fn inc_mutations_applied(&self) {
        self.mutations_applied.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "mutations_applied", "counter incremented");
    }

    pub fn inc_version_conflicts(&self) {
        self.version_conflicts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "version_conflicts", "counter incremented");
    }

    pub fn inc_fatal_errors(&self) {
        self.fatal_errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fatal_errors", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            events_received = self.events_received(),
            events_skipped = self.events_skipped(),
            mutations_applied = self.mutations_applied(),
            version_conflicts = self.version_conflicts(),
            fatal_errors = self.fatal_errors(),
        );
    }

    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    pub fn events_skipped(&self) -> u64 {
        self.events_skipped.load(Ordering::Relaxed)
    }

    pub fn mutations_applied(&self) -> u64 {
        self.mutations_applied.load(Ordering::Relaxed)
    }

    pub fn version_conflicts(&self) -> u64 {
        self.version_conflicts.load(Ordering::Relaxed)
    }

    pub fn fatal_errors(&self) -> u64 {
        self.fatal_errors.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.events_received.store(0, Ordering::Relaxed);
        self.events_skipped.store(0, Ordering::Relaxed);
        self.mutations_applied.store(0, Ordering::Relaxed);
        self.version_conflicts.store(0, Ordering::Relaxed);
        self.fatal_errors.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_and_reset() {
        let m = Metrics::new();
        m.inc_events_received();
        m.inc_events_received();
        m.inc_version_conflicts();
        assert_eq!(m.events_received(), 2);
        assert_eq!(m.version_conflicts(), 1);
        assert_eq!(m.mutations_applied(), 0);

        m.reset();
        assert_eq!(m.events_received(), 0);
        assert_eq!(m.version_conflicts(), 0);
    }
}
