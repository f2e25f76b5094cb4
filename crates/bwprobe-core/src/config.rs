use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default value for `latency-min`.
    pub const DEFAULT_LATENCY_MIN: Duration = Duration::from_millis(10);

    /// The default value for `latency-max`.
    pub const DEFAULT_LATENCY_MAX: Duration = Duration::from_millis(800);

    /// The default value for `latency-undef`.
    pub const DEFAULT_LATENCY_UNDEFINED: Duration = Duration::from_millis(100);

    /// The default value for `test-time`.
    pub const DEFAULT_TEST_DURATION: Duration = Duration::from_millis(2000);
}

/// Probing policy.
///
/// A `test_duration` of zero disables probing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Policy {
    /// The smallest latency which can be detected.
    pub latency_min: Duration,
    /// The largest latency assumed.
    pub latency_max: Duration,
    /// The latency reported for satellite, modem or otherwise unmeasurable links.
    pub latency_undefined: Duration,
    /// How long to keep sending throughput probes.
    pub test_duration: Duration,
}

impl Policy {
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !self.test_duration.is_zero()
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            latency_min: defaults::DEFAULT_LATENCY_MIN,
            latency_max: defaults::DEFAULT_LATENCY_MAX,
            latency_undefined: defaults::DEFAULT_LATENCY_UNDEFINED,
            test_duration: defaults::DEFAULT_TEST_DURATION,
        }
    }
}

/// Policy values explicitly set within a single configuration scope.
///
/// Scopes are merged from the broadest to the narrowest, a value set in a
/// narrower scope wins.  Values unset in every scope take their defaults.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct PolicyOverrides {
    pub latency_min: Option<Duration>,
    pub latency_max: Option<Duration>,
    pub latency_undefined: Option<Duration>,
    pub test_duration: Option<Duration>,
}

impl PolicyOverrides {
    /// Merge `self` (the narrower scope) over `parent` (the broader scope).
    #[must_use]
    pub fn merge(self, parent: &Self) -> Self {
        Self {
            latency_min: self.latency_min.or(parent.latency_min),
            latency_max: self.latency_max.or(parent.latency_max),
            latency_undefined: self.latency_undefined.or(parent.latency_undefined),
            test_duration: self.test_duration.or(parent.test_duration),
        }
    }

    /// Resolve the final policy, applying defaults for any unset value.
    #[must_use]
    pub fn resolve(&self) -> Policy {
        Policy {
            latency_min: self.latency_min.unwrap_or(defaults::DEFAULT_LATENCY_MIN),
            latency_max: self.latency_max.unwrap_or(defaults::DEFAULT_LATENCY_MAX),
            latency_undefined: self
                .latency_undefined
                .unwrap_or(defaults::DEFAULT_LATENCY_UNDEFINED),
            test_duration: self
                .test_duration
                .unwrap_or(defaults::DEFAULT_TEST_DURATION),
        }
    }
}
