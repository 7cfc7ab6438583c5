//! Process-wide atomic counters.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event at the end of a command.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters with no allocations and no locking.
pub struct Metrics {
    requests_sent: AtomicU64,
    provisioning_polls: AtomicU64,
    auxiliary_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            requests_sent: AtomicU64::new(0),
            provisioning_polls: AtomicU64::new(0),
            auxiliary_failures: AtomicU64::new(0),
        }
    }

    /// Increment the API-requests counter by one.
    pub fn inc_requests(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "requests_sent", "counter incremented");
    }

    /// Increment the provisioning-polls counter by one.
    pub fn inc_polls(&self) {
        self.provisioning_polls.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "provisioning_polls", "counter incremented");
    }

    /// Increment the auxiliary-failures counter by one.
    pub fn inc_auxiliary_failures(&self) {
        self.auxiliary_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "auxiliary_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            requests_sent = self.requests_sent(),
            provisioning_polls = self.provisioning_polls(),
            auxiliary_failures = self.auxiliary_failures(),
        );
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    pub fn provisioning_polls(&self) -> u64 {
        self.provisioning_polls.load(Ordering::Relaxed)
    }

    pub fn auxiliary_failures(&self) -> u64 {
        self.auxiliary_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.requests_sent.store(0, Ordering::Relaxed);
        self.provisioning_polls.store(0, Ordering::Relaxed);
        self.auxiliary_failures.store(0, Ordering::Relaxed);
    }
}
