use crate::config::{BwprobeConfig, LinkConfig};
use crate::sim::{Event, Outcome, SimOutcome};
use bwprobe_core::{Action, Estimate, Millis, Policy};
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

#[derive(Serialize)]
pub struct Report {
    pub info: Info,
    pub outcome: OutcomeKind,
    pub probes_sent: u32,
    pub bytes_out: u64,
    pub estimate: Option<EstimateReport>,
    pub events: Vec<EventReport>,
}

impl Report {
    pub fn new(cfg: &BwprobeConfig, outcome: &SimOutcome) -> Self {
        Self {
            info: Info {
                app: cfg.app.clone(),
                policy: PolicyReport::from(&cfg.policy),
                link: LinkReport::from(&cfg.link),
            },
            outcome: OutcomeKind(outcome.outcome),
            probes_sent: outcome.probes_sent,
            bytes_out: outcome.bytes_out,
            estimate: outcome.estimate.as_ref().map(EstimateReport::from),
            events: outcome.events.iter().map(EventReport::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct Info {
    pub app: Option<String>,
    pub policy: PolicyReport,
    pub link: LinkReport,
}

#[derive(Serialize)]
pub struct PolicyReport {
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    pub latency_undef_ms: u64,
    pub test_time_ms: u64,
}

impl From<&Policy> for PolicyReport {
    fn from(policy: &Policy) -> Self {
        Self {
            latency_min_ms: Millis::from(policy.latency_min).0,
            latency_max_ms: Millis::from(policy.latency_max).0,
            latency_undef_ms: Millis::from(policy.latency_undefined).0,
            test_time_ms: Millis::from(policy.test_duration).0,
        }
    }
}

#[derive(Serialize)]
pub struct LinkReport {
    pub latency_ms: u64,
    pub bandwidth_kbps: u64,
    pub relay: bool,
    pub drop_probe: Option<u32>,
}

impl From<&LinkConfig> for LinkReport {
    fn from(link: &LinkConfig) -> Self {
        Self {
            latency_ms: Millis::from(link.latency).0,
            bandwidth_kbps: link.bandwidth_kbps,
            relay: link.relay,
            drop_probe: link.drop_probe,
        }
    }
}

#[derive(Serialize)]
pub struct EstimateReport {
    #[serde(serialize_with = "fixed_width")]
    pub kbps: f64,
    #[serde(serialize_with = "fixed_width")]
    pub kilobits: f64,
    #[serde(serialize_with = "fixed_width")]
    pub seconds: f64,
    pub latency_ms: u64,
}

impl From<&Estimate> for EstimateReport {
    fn from(estimate: &Estimate) -> Self {
        Self {
            kbps: estimate.kbps,
            kilobits: estimate.kilobits,
            seconds: estimate.seconds,
            latency_ms: estimate.latency.0,
        }
    }
}

#[derive(Serialize)]
pub struct EventReport {
    pub at_ms: u64,
    pub action: ActionKind,
}

impl From<&Event> for EventReport {
    fn from(event: &Event) -> Self {
        Self {
            at_ms: event.at.0,
            action: ActionKind(event.action),
        }
    }
}

pub struct OutcomeKind(pub Outcome);

impl Display for OutcomeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Outcome::Completed => write!(f, "completed"),
            Outcome::Rejected => write!(f, "rejected"),
            Outcome::Stalled => write!(f, "stalled"),
        }
    }
}

impl Serialize for OutcomeKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

pub struct ActionKind(pub Action);

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Action::Started => write!(f, "started"),
            Action::Rejected(reason) => write!(f, "rejected ({reason})"),
            Action::ProbeSent => write!(f, "probe sent"),
            Action::Finalized(_) => write!(f, "finalized"),
            Action::Completed => write!(f, "completed"),
            Action::NoAction => write!(f, "no action"),
        }
    }
}

impl Serialize for ActionKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

pub fn fixed_width<S>(val: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{val:.2}"))
}
