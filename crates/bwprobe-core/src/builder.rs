use crate::config::{defaults, Policy};
use crate::constants::PAYLOAD_LENGTH;
use crate::error::{Error, Result};
use crate::payload::ProbePayload;
use crate::transport::{Clock, MonotonicClock};
use crate::Detector;
use std::time::Duration;

/// Build a detector.
///
/// # Examples
///
/// ```rust
/// # fn main() -> anyhow::Result<()> {
/// use bwprobe_core::Builder;
/// use std::time::Duration;
///
/// let detector = Builder::new()
///     .latency_max(Duration::from_millis(500))
///     .test_duration(Duration::from_secs(3))
///     .build()?;
/// assert_eq!(Duration::from_secs(3), detector.policy().test_duration);
/// # Ok(())
/// # }
/// ```
///
/// # See Also
///
/// - [`Detector`] - A bandwidth detector.
#[derive(Debug, Clone)]
pub struct Builder {
    latency_min: Duration,
    latency_max: Duration,
    latency_undefined: Duration,
    test_duration: Duration,
    payload: Option<ProbePayload>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            latency_min: defaults::DEFAULT_LATENCY_MIN,
            latency_max: defaults::DEFAULT_LATENCY_MAX,
            latency_undefined: defaults::DEFAULT_LATENCY_UNDEFINED,
            test_duration: defaults::DEFAULT_TEST_DURATION,
            payload: None,
        }
    }
}

impl Builder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set every policy value.
    #[must_use]
    pub fn policy(self, policy: Policy) -> Self {
        Self {
            latency_min: policy.latency_min,
            latency_max: policy.latency_max,
            latency_undefined: policy.latency_undefined,
            test_duration: policy.test_duration,
            ..self
        }
    }

    /// Set the smallest latency which can be detected.
    #[must_use]
    pub fn latency_min(self, latency_min: Duration) -> Self {
        Self {
            latency_min,
            ..self
        }
    }

    /// Set the largest latency assumed.
    #[must_use]
    pub fn latency_max(self, latency_max: Duration) -> Self {
        Self {
            latency_max,
            ..self
        }
    }

    /// Set the latency reported for links whose latency cannot be measured.
    #[must_use]
    pub fn latency_undefined(self, latency_undefined: Duration) -> Self {
        Self {
            latency_undefined,
            ..self
        }
    }

    /// Set how long throughput probes are sent for.
    ///
    /// A duration of zero disables probing.
    #[must_use]
    pub fn test_duration(self, test_duration: Duration) -> Self {
        Self {
            test_duration,
            ..self
        }
    }

    /// Use an existing probe payload.
    ///
    /// This allows several detectors to share a single payload.  If not set a
    /// new payload of 16 KiB is generated when the detector is built.
    #[must_use]
    pub fn payload(self, payload: Option<ProbePayload>) -> Self {
        Self { payload, ..self }
    }

    /// Build the [`Detector`] with a monotonic clock.
    pub fn build(self) -> Result<Detector> {
        self.build_with_clock(MonotonicClock::new())
    }

    /// Build the [`Detector`] with the given clock.
    ///
    /// A `latency_min` greater than `latency_max` is accepted and logged, the
    /// minimum takes precedence when latency is clamped.
    pub fn build_with_clock<C: Clock>(self, clock: C) -> Result<Detector<C>> {
        for (name, duration) in [
            ("latency_min", self.latency_min),
            ("latency_max", self.latency_max),
            ("latency_undefined", self.latency_undefined),
            ("test_duration", self.test_duration),
        ] {
            if u64::try_from(duration.as_millis()).is_err() {
                return Err(Error::BadConfig(format!(
                    "{name} {duration:?} exceeds the maximum"
                )));
            }
        }
        if self.latency_min > self.latency_max {
            tracing::warn!(
                latency_min = ?self.latency_min,
                latency_max = ?self.latency_max,
                "latency_min exceeds latency_max"
            );
        }
        let policy = Policy {
            latency_min: self.latency_min,
            latency_max: self.latency_max,
            latency_undefined: self.latency_undefined,
            test_duration: self.test_duration,
        };
        let payload = self
            .payload
            .unwrap_or_else(|| ProbePayload::generate(PAYLOAD_LENGTH));
        Ok(Detector::new(policy, payload, clock))
    }
}
