use crate::error::Result;
use crate::payload::ProbePayload;
use crate::strategy::Estimate;
use crate::types::Millis;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// An abstraction over the connection of a single session.
///
/// Messages are sent fire-and-forget, implementations are expected to encode
/// and enqueue them without blocking.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Send a probe.
    ///
    /// A `payload` of `None` sends a probe with an empty body.
    fn send_probe(&mut self, payload: Option<ProbePayload>) -> Result<()>;

    /// Send the final estimate.
    fn send_result(&mut self, estimate: &Estimate) -> Result<()>;

    /// The cumulative number of bytes sent on the connection.
    fn bytes_out(&self) -> u64;

    /// Is this connection itself a relayed stream?
    fn is_relay(&self) -> bool;
}

/// A monotonic millisecond clock.
///
/// The clock need not advance more often than once per event loop tick.
pub trait Clock {
    fn now(&self) -> Millis;
}

/// A clock measuring milliseconds since it was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Millis {
        Millis::from(self.origin.elapsed())
    }
}

/// A clock which only moves when told to.
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    #[must_use]
    pub fn new(start: Millis) -> Self {
        Self(Arc::new(AtomicU64::new(start.0)))
    }

    pub fn set(&self, now: Millis) {
        self.0.store(now.0, Ordering::Relaxed);
    }

    pub fn advance(&self, by: Millis) {
        self.0.fetch_add(by.0, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        Millis(self.0.load(Ordering::Relaxed))
    }
}
