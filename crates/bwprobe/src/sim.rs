use crate::config::LinkConfig;
use bwprobe_amf::command::Command;
use bwprobe_amf::value::Value;
use bwprobe_core::{
    check_command, done_command, encode_command, inbound, Action, Builder, Clock, Detector,
    Estimate, ManualClock, Millis, Policy, ProbePayload, SessionProbe, Transport,
    CHECK_TRANSACTION, DONE_TRANSACTION,
};
use std::collections::VecDeque;
use tracing::instrument;

/// The outcome of a simulated episode.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Outcome {
    /// The estimate was acknowledged and the episode ended.
    Completed,
    /// The episode was never started.
    Rejected,
    /// The episode is still active with no further replies to process.
    Stalled,
}

/// An action taken by the detector at a point in simulated time.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub at: Millis,
    pub action: Action,
}

/// The result of a simulated episode.
#[derive(Debug, Clone, PartialEq)]
pub struct SimOutcome {
    pub outcome: Outcome,
    pub estimate: Option<Estimate>,
    pub probes_sent: u32,
    pub bytes_out: u64,
    pub events: Vec<Event>,
}

/// Drive a probing episode across a simulated link.
///
/// The server and peer exchange encoded AMF0 commands.  Each outbound message
/// occupies the downstream link for `len * 8 / bandwidth` and then arrives
/// after the one-way latency.  Replies are small and only incur the latency.
#[derive(Debug)]
pub struct Simulation {
    detector: Detector<ManualClock>,
    clock: ManualClock,
    link: LinkConfig,
}

impl Simulation {
    pub fn new(policy: Policy, link: LinkConfig) -> anyhow::Result<Self> {
        let clock = ManualClock::default();
        let detector = Builder::new()
            .policy(policy)
            .build_with_clock(clock.clone())?;
        Ok(Self {
            detector,
            clock,
            link,
        })
    }

    /// Use a fixed payload rather than a random one.
    #[cfg(test)]
    pub fn with_payload(
        policy: Policy,
        link: LinkConfig,
        payload: ProbePayload,
    ) -> anyhow::Result<Self> {
        let clock = ManualClock::default();
        let detector = Builder::new()
            .policy(policy)
            .payload(Some(payload))
            .build_with_clock(clock.clone())?;
        Ok(Self {
            detector,
            clock,
            link,
        })
    }

    /// Run a single episode to completion.
    #[instrument(skip(self), level = "trace")]
    pub fn run(&self) -> anyhow::Result<SimOutcome> {
        let mut transport = SimTransport::new(self.clock.clone(), self.link);
        let mut probe = SessionProbe::new();
        let start = Command::new(inbound::CHECK_BANDWIDTH, 0.0, vec![Value::Null]).encode()?;
        let mut events = vec![];
        let action = self.detector.handle(&mut probe, &mut transport, &start)?;
        events.push(Event {
            at: self.clock.now(),
            action,
        });
        if !matches!(action, Action::Rejected(_)) {
            while let Some(delivery) = transport.inbound.pop_front() {
                self.clock.set(delivery.at);
                let action = self
                    .detector
                    .handle(&mut probe, &mut transport, &delivery.bytes)?;
                tracing::debug!(at = %delivery.at, ?action);
                events.push(Event {
                    at: delivery.at,
                    action,
                });
            }
        }
        let outcome = if matches!(action, Action::Rejected(_)) {
            Outcome::Rejected
        } else if probe.is_active() {
            Outcome::Stalled
        } else {
            Outcome::Completed
        };
        Ok(SimOutcome {
            outcome,
            estimate: transport.estimate,
            probes_sent: transport.probes_sent,
            bytes_out: transport.bytes_out,
            events,
        })
    }
}

/// A command in flight from the peer to the server.
#[derive(Debug)]
struct Delivery {
    at: Millis,
    bytes: Vec<u8>,
}

/// The server end of a simulated connection, with the peer folded in.
#[derive(Debug)]
struct SimTransport {
    clock: ManualClock,
    latency: Millis,
    bandwidth_kbps: u64,
    relay: bool,
    drop_probe: Option<u32>,
    bytes_out: u64,
    link_free_at: Millis,
    probes_sent: u32,
    probes_acked: u32,
    inbound: VecDeque<Delivery>,
    estimate: Option<Estimate>,
}

impl SimTransport {
    fn new(clock: ManualClock, link: LinkConfig) -> Self {
        Self {
            clock,
            latency: Millis::from(link.latency),
            bandwidth_kbps: link.bandwidth_kbps,
            relay: link.relay,
            drop_probe: link.drop_probe,
            bytes_out: 0,
            link_free_at: Millis(0),
            probes_sent: 0,
            probes_acked: 0,
            inbound: VecDeque::new(),
            estimate: None,
        }
    }

    /// Send a command downstream and return when the peer receives it.
    fn transmit(&mut self, cmd: &Command) -> bwprobe_core::Result<Millis> {
        let len = encode_command(cmd)?.len() as u64;
        self.bytes_out += len;
        let start = self.clock.now().max(self.link_free_at);
        // kbps is bits per millisecond
        let transfer = Millis((len * 8).div_ceil(self.bandwidth_kbps));
        self.link_free_at = start + transfer;
        Ok(self.link_free_at + self.latency)
    }

    /// Queue the peer's `_result` reply.
    fn reply(
        &mut self,
        at_peer: Millis,
        transaction: i64,
        count: f64,
    ) -> bwprobe_core::Result<()> {
        let cmd = Command::new(
            inbound::RESULT,
            transaction as f64,
            vec![Value::Null, Value::Number(count)],
        );
        let bytes = encode_command(&cmd)?;
        self.inbound.push_back(Delivery {
            at: at_peer + self.latency,
            bytes,
        });
        Ok(())
    }
}

impl Transport for SimTransport {
    fn send_probe(&mut self, payload: Option<ProbePayload>) -> bwprobe_core::Result<()> {
        let at_peer = self.transmit(&check_command(payload.as_ref()))?;
        self.probes_sent += 1;
        if self.drop_probe == Some(self.probes_sent) {
            tracing::debug!(probe = self.probes_sent, "dropping probe");
            return Ok(());
        }
        self.probes_acked += 1;
        self.reply(at_peer, CHECK_TRANSACTION, f64::from(self.probes_acked))
    }

    fn send_result(&mut self, estimate: &Estimate) -> bwprobe_core::Result<()> {
        let at_peer = self.transmit(&done_command(estimate))?;
        self.estimate = Some(*estimate);
        self.reply(at_peer, DONE_TRANSACTION, 0.0)
    }

    fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    fn is_relay(&self) -> bool {
        self.relay
    }
}
