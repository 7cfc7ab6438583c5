//! Provisioning wait: poll the active machine until it has an address.
//!
//! State machine:
//!
//! ```text
//! Pending --[poll returns usable address]--> Ready(ip)
//! Pending --[elapsed >= timeout]----------> TimedOut
//! Pending --[ticker cancelled]------------> TimedOut
//! ```
//!
//! Time comes from a [`Ticker`], so the loop runs against a paused
//! tokio clock or a hand-driven ticker in tests. Progress reporting is a
//! best-effort side channel and is stopped on every exit path.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::context::Context;
use crate::domain::Result;
use crate::metrics::METRICS;
use crate::obs;
use crate::probe;

/// Fixed delay between two polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(6);

/// Wall-clock bound measured from entry into `Pending`.
pub const PROVISIONING_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Waiter state. `Ready` and `TimedOut` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningStatus {
    Pending,
    Ready(String),
    TimedOut,
}

impl ProvisioningStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProvisioningStatus::Pending)
    }
}

/// Result of waiting for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Elapsed,
    Cancelled,
}

/// Cancellable source of poll ticks.
#[async_trait]
pub trait Ticker: Send {
    /// Wait one interval, or return early on cancellation.
    async fn tick(&mut self) -> Tick;

    fn cancel(&self);

    fn is_cancelled(&self) -> bool;

    /// Monotonic time since the ticker was created. Callers measure
    /// intervals as differences between two readings.
    fn elapsed(&self) -> Duration;
}

/// Ticker backed by the tokio clock and a cancellation token.
pub struct IntervalTicker {
    period: Duration,
    started: Instant,
    token: CancellationToken,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self::with_token(period, CancellationToken::new())
    }

    /// Share `token` with whoever may cancel the wait (e.g. a Ctrl-C task).
    pub fn with_token(period: Duration, token: CancellationToken) -> Self {
        Self {
            period,
            started: Instant::now(),
            token,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> Tick {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Tick::Cancelled,
            _ = tokio::time::sleep(self.period) => Tick::Elapsed,
        }
    }

    fn cancel(&self) {
        self.token.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Source of the address being waited for.
#[async_trait]
pub trait AddressProbe: Send + Sync {
    /// `Ok(None)` while still provisioning.
    async fn poll(&self) -> Result<Option<String>>;
}

/// Polls the active machine's profile record.
pub struct ActiveMachineAddress<'a> {
    ctx: &'a Context,
}

impl<'a> ActiveMachineAddress<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl AddressProbe for ActiveMachineAddress<'_> {
    async fn poll(&self) -> Result<Option<String>> {
        probe::active_machine_address(self.ctx).await
    }
}

/// Visual progress indicator. Implementations must not block.
pub trait Progress: Send + Sync {
    fn start(&self, message: &str);
    fn stop(&self);
}

/// Progress sink that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&self, _message: &str) {}
    fn stop(&self) {}
}

/// Stops the indicator when dropped.
struct ProgressGuard<'a> {
    progress: &'a dyn Progress,
}

impl<'a> ProgressGuard<'a> {
    fn start(progress: &'a dyn Progress, message: &str) -> Self {
        progress.start(message);
        Self { progress }
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.progress.stop();
    }
}

/// Drives the provisioning state machine.
pub struct ProvisioningWaiter<'a> {
    progress: &'a dyn Progress,
    timeout: Duration,
}

impl<'a> ProvisioningWaiter<'a> {
    pub fn new(progress: &'a dyn Progress) -> Self {
        Self {
            progress,
            timeout: PROVISIONING_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Poll `probe` once per tick until it yields an address, the timeout
    /// elapses, or the ticker is cancelled. The timeout counts from entry
    /// into this call, not from the ticker's creation. Probe errors
    /// propagate.
    pub async fn wait<P, T>(&self, probe: &P, ticker: &mut T) -> Result<ProvisioningStatus>
    where
        P: AddressProbe + ?Sized,
        T: Ticker + ?Sized,
    {
        let _guard = ProgressGuard::start(
            self.progress,
            "Waiting for the machine to start in order to fetch the IP address (this might take a while).",
        );

        let entered = ticker.elapsed();

        let mut polls = 0u64;
        let mut status = ProvisioningStatus::Pending;

        while !status.is_terminal() {
            let pending = ticker.elapsed().saturating_sub(entered);
            if ticker.is_cancelled() || pending >= self.timeout {
                status = ProvisioningStatus::TimedOut;
                break;
            }

            polls += 1;
            METRICS.inc_polls();
            if let Some(address) = probe.poll().await? {
                status = if ticker.is_cancelled() {
                    ProvisioningStatus::TimedOut
                } else {
                    ProvisioningStatus::Ready(address)
                };
                break;
            }
            debug!(polls, elapsed_secs = pending.as_secs(), "address still pending");

            if ticker.tick().await == Tick::Cancelled {
                status = ProvisioningStatus::TimedOut;
            }
        }

        let outcome = match &status {
            ProvisioningStatus::Ready(_) => "ready",
            _ => "timed_out",
        };
        let waited = ticker.elapsed().saturating_sub(entered);
        obs::emit_provisioning_finished(outcome, polls, waited.as_secs());
        Ok(status)
    }
}
