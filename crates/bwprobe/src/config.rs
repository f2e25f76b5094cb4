use anyhow::anyhow;
use bwprobe_core::{Policy, PolicyOverrides};
use clap::ValueEnum;
use file::ConfigFile;
use serde::Deserialize;
use std::time::Duration;

mod cmd;
mod constants;
mod file;

pub use cmd::Args;

/// How to format log data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Display log data in a compact format.
    Compact,
    /// Display log data in a pretty format.
    Pretty,
    /// Display log data in a json format.
    Json,
}

/// How to log event spans.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogSpanEvents {
    /// Do not display event spans.
    Off,
    /// Display enter and exit event spans.
    Active,
    /// Display all event spans.
    Full,
}

/// How to report the outcome of an episode.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    /// A human readable summary.
    Text,
    /// A json document.
    Json,
}

/// The simulated link.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LinkConfig {
    /// The one-way latency.
    pub latency: Duration,
    /// The downstream bandwidth in kilobits per second.
    pub bandwidth_kbps: u64,
    /// Is the connection a relay?
    pub relay: bool,
    /// The 1-based index of a probe to drop.
    pub drop_probe: Option<u32>,
}

/// Fully parsed and validated configuration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BwprobeConfig {
    pub app: Option<String>,
    pub policy: Policy,
    pub link: LinkConfig,
    pub report_format: ReportFormat,
    pub verbose: bool,
    pub log_format: LogFormat,
    pub log_filter: String,
    pub log_span_events: LogSpanEvents,
}

impl BwprobeConfig {
    pub fn from(args: Args) -> anyhow::Result<Self> {
        let cfg_file = if let Some(cfg) = &args.config_file {
            file::read_config_file(cfg)?
        } else {
            file::read_default_config_file()?.unwrap_or_default()
        };
        Self::build_config(args, &cfg_file)
    }

    fn build_config(args: Args, cfg_file: &ConfigFile) -> anyhow::Result<Self> {
        let cfg_file_bwprobe = cfg_file.bwprobe.as_ref();
        let cfg_file_link = cfg_file.link.as_ref();
        let cmd_overrides = PolicyOverrides {
            latency_min: args.latency_min,
            latency_max: args.latency_max,
            latency_undefined: args.latency_undef,
            test_duration: args.test_time,
        };
        let policy = cmd_overrides
            .merge(&cfg_file.policy_overrides(args.app.as_deref()))
            .resolve();
        let report_format = cfg_layer(
            args.report_format,
            cfg_file_bwprobe.and_then(|c| c.report_format),
            constants::DEFAULT_REPORT_FORMAT,
        );
        let log_format = cfg_layer(
            args.log_format,
            cfg_file_bwprobe.and_then(|c| c.log_format),
            constants::DEFAULT_LOG_FORMAT,
        );
        let log_filter = cfg_layer(
            args.log_filter,
            cfg_file_bwprobe.and_then(|c| c.log_filter.clone()),
            String::from(constants::DEFAULT_LOG_FILTER),
        );
        let log_span_events = cfg_layer(
            args.log_span_events,
            cfg_file_bwprobe.and_then(|c| c.log_span_events),
            constants::DEFAULT_LOG_SPAN_EVENTS,
        );
        let latency = cfg_layer(
            args.link_latency,
            cfg_file_link.and_then(|c| c.latency),
            constants::DEFAULT_LINK_LATENCY,
        );
        let bandwidth_kbps = cfg_layer(
            args.bandwidth,
            cfg_file_link.and_then(|c| c.bandwidth),
            constants::DEFAULT_LINK_BANDWIDTH,
        );
        let relay = cfg_layer_bool_flag(
            args.relay,
            cfg_file_link.and_then(|c| c.relay),
            constants::DEFAULT_LINK_RELAY,
        );
        validate_bandwidth(bandwidth_kbps)?;
        validate_drop_probe(args.drop_probe)?;
        Ok(Self {
            app: args.app,
            policy,
            link: LinkConfig {
                latency,
                bandwidth_kbps,
                relay,
                drop_probe: args.drop_probe,
            },
            report_format,
            verbose: args.verbose,
            log_format,
            log_filter,
            log_span_events,
        })
    }
}

/// Parse a duration, accepting `off` for zero and a bare number as milliseconds.
pub fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("off") {
        Ok(Duration::ZERO)
    } else if let Ok(millis) = value.parse::<u64>() {
        Ok(Duration::from_millis(millis))
    } else {
        Ok(humantime::parse_duration(value)?)
    }
}

fn cfg_layer<T>(fst: Option<T>, snd: Option<T>, def: T) -> T {
    match (fst, snd) {
        (Some(val), _) | (None, Some(val)) => val,
        (None, None) => def,
    }
}

const fn cfg_layer_bool_flag(fst: bool, snd: Option<bool>, default: bool) -> bool {
    match (fst, snd) {
        (true, _) => true,
        (false, Some(val)) => val,
        (false, None) => default,
    }
}

fn validate_bandwidth(bandwidth_kbps: u64) -> anyhow::Result<()> {
    if bandwidth_kbps == 0 {
        Err(anyhow!("bandwidth must be greater than zero"))
    } else {
        Ok(())
    }
}

fn validate_drop_probe(drop_probe: Option<u32>) -> anyhow::Result<()> {
    match drop_probe {
        Some(0) => Err(anyhow!("drop-probe must be greater than zero")),
        _ => Ok(()),
    }
}
