use crate::config::Policy;
use crate::constants::{MIN_ELAPSED, UNDEFINED_LATENCY_GAP};
use crate::strategy::Estimate;
use crate::types::Millis;
use tracing::instrument;

/// The phase of a probing episode.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Phase {
    /// No episode is in progress.
    #[default]
    Idle,
    /// The latency probe has been sent and no reply has been received.
    AwaitingFirstReply,
    /// Throughput probes are in flight.
    Probing,
    /// The estimate has been sent and the peer has not yet acknowledged it.
    AwaitingDoneAck,
}

impl Phase {
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// The probing state attached to a single connection.
///
/// The state is created lazily the first time an episode is started and is
/// dropped along with the connection.
#[derive(Debug, Default)]
pub struct SessionProbe {
    state: Option<SessionProbeState>,
}

impl SessionProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The probing state, if an episode has ever been started.
    #[must_use]
    pub const fn state(&self) -> Option<&SessionProbeState> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.as_ref().is_some_and(SessionProbeState::is_active)
    }

    pub(crate) fn get_or_create(&mut self) -> &mut SessionProbeState {
        self.state.get_or_insert_with(SessionProbeState::default)
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut SessionProbeState> {
        self.state.as_mut().filter(|state| state.is_active())
    }
}

/// Mutable state of a probing episode.
///
/// All mutations are performed via methods on this type; the fields are reset
/// at the start of every episode.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct SessionProbeState {
    /// The phase of the current (or last) episode.
    phase: Phase,
    /// When the current episode began.
    episode_start: Millis,
    /// The number of probes sent this episode.
    probes_sent: u32,
    /// The number of probe replies received this episode.
    replies_received: u32,
    /// When the first reply was received.
    first_reply: Millis,
    /// When the second reply was received.
    second_reply: Millis,
    /// The number of probe round trips charged to latency.
    cumulative_latency_units: u32,
    /// The working latency estimate.
    latency: Millis,
    /// The connection bytes-sent counter when the episode began.
    bytes_out_at_start: u64,
}

impl SessionProbeState {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    #[must_use]
    pub const fn episode_start(&self) -> Millis {
        self.episode_start
    }

    #[must_use]
    pub const fn probes_sent(&self) -> u32 {
        self.probes_sent
    }

    #[must_use]
    pub const fn replies_received(&self) -> u32 {
        self.replies_received
    }

    #[must_use]
    pub const fn first_reply(&self) -> Millis {
        self.first_reply
    }

    #[must_use]
    pub const fn second_reply(&self) -> Millis {
        self.second_reply
    }

    #[must_use]
    pub const fn cumulative_latency_units(&self) -> u32 {
        self.cumulative_latency_units
    }

    #[must_use]
    pub const fn latency(&self) -> Millis {
        self.latency
    }

    #[must_use]
    pub const fn bytes_out_at_start(&self) -> u64 {
        self.bytes_out_at_start
    }

    /// Begin a new episode, the latency probe is counted as sent.
    #[instrument(skip(self), level = "trace")]
    pub(crate) fn begin(&mut self, now: Millis, latency_min: Millis, bytes_out: u64) {
        *self = Self {
            phase: Phase::AwaitingFirstReply,
            episode_start: now,
            probes_sent: 1,
            replies_received: 0,
            first_reply: Millis(0),
            second_reply: Millis(0),
            cumulative_latency_units: 0,
            latency: latency_min,
            bytes_out_at_start: bytes_out,
        };
    }

    /// Record a probe reply received at `now` and return the time elapsed
    /// since the episode began.
    ///
    /// The first reply measures the latency, clamped to `latency_max` and then
    /// raised to `latency_min`.  This order is kept even when `latency_min`
    /// exceeds `latency_max`, in which case the minimum wins.
    #[instrument(skip(self, policy), level = "trace")]
    pub(crate) fn record_reply(&mut self, now: Millis, policy: &Policy) -> Millis {
        let elapsed = now.saturating_sub(self.episode_start);
        self.replies_received += 1;
        match self.replies_received {
            1 => {
                self.latency = elapsed
                    .min(Millis::from(policy.latency_max))
                    .max(Millis::from(policy.latency_min));
                self.first_reply = now;
            }
            2 => self.second_reply = now,
            _ => {}
        }
        elapsed
    }

    /// Count the first throughput probe sent after the latency probe reply.
    ///
    /// This probe is not charged to latency.
    pub(crate) fn bootstrap_probe(&mut self) {
        debug_assert_eq!(Phase::AwaitingFirstReply, self.phase);
        self.probes_sent += 1;
        self.phase = Phase::Probing;
    }

    /// Count an additional throughput probe, charged to latency.
    pub(crate) fn extend_probe(&mut self) {
        self.probes_sent += 1;
        self.cumulative_latency_units += 1;
    }

    /// Has every probe sent been acknowledged?
    #[must_use]
    pub const fn all_replied(&self) -> bool {
        self.replies_received == self.probes_sent
    }

    /// Compute the final estimate.
    ///
    /// The episode remains active until the peer acknowledges the estimate.
    #[instrument(skip(self, policy), level = "trace")]
    pub(crate) fn finalize(&mut self, now: Millis, bytes_out: u64, policy: &Policy) -> Estimate {
        let latency_undefined = Millis::from(policy.latency_undefined);
        if self.latency >= latency_undefined
            && self.second_reply.saturating_sub(self.first_reply) > UNDEFINED_LATENCY_GAP
        {
            self.latency = latency_undefined;
        }
        let delta_bits = bytes_out.saturating_sub(self.bytes_out_at_start) as f64 * 8.0;
        let raw_seconds = now
            .saturating_sub(self.episode_start)
            .max(MIN_ELAPSED)
            .as_secs_f64();
        let latency_overhead =
            self.latency.as_secs_f64() * f64::from(self.cumulative_latency_units);
        let seconds = if raw_seconds - latency_overhead <= 0.0 {
            raw_seconds
        } else {
            raw_seconds - latency_overhead
        };
        self.phase = Phase::AwaitingDoneAck;
        Estimate {
            kbps: delta_bits / 1000.0 / seconds,
            kilobits: delta_bits / 1000.0,
            seconds,
            latency: self.latency,
        }
    }

    /// End the episode.
    pub(crate) fn end(&mut self) {
        self.phase = Phase::Idle;
    }
}
