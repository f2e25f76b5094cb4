use crate::config::{parse_duration, LogFormat, LogSpanEvents, ReportFormat};
use clap::Parser;
use std::time::Duration;

/// Simulate an RTMP bandwidth detection episode and report the estimate
#[derive(Parser, Debug)]
#[command(name = "bwprobe", author, version, about, long_about = None)]
pub struct Args {
    /// Config file
    #[arg(short = 'c', long, value_hint = clap::ValueHint::FilePath)]
    pub config_file: Option<String>,

    /// The application scope to apply from the config file
    #[arg(short = 'a', long)]
    pub app: Option<String>,

    /// The smallest latency which can be detected [default: 10ms]
    #[arg(long, value_parser = parse_duration)]
    pub latency_min: Option<Duration>,

    /// The largest latency assumed [default: 800ms]
    #[arg(long, value_parser = parse_duration)]
    pub latency_max: Option<Duration>,

    /// The latency reported for satellite class links [default: 100ms]
    #[arg(long, value_parser = parse_duration)]
    pub latency_undef: Option<Duration>,

    /// How long to send throughput probes for, `off` disables probing [default: 2s]
    #[arg(short = 't', long, value_parser = parse_duration)]
    pub test_time: Option<Duration>,

    /// The one-way latency of the simulated link [default: 25ms]
    #[arg(short = 'l', long, value_parser = parse_duration)]
    pub link_latency: Option<Duration>,

    /// The downstream bandwidth of the simulated link in kbps [default: 10000]
    #[arg(short = 'b', long)]
    pub bandwidth: Option<u64>,

    /// Simulate a relayed connection
    #[arg(long)]
    pub relay: bool,

    /// Drop the Nth probe sent (starting from 1)
    #[arg(long)]
    pub drop_probe: Option<u32>,

    /// How to report the outcome [default: text]
    #[arg(value_enum, short = 'r', long)]
    pub report_format: Option<ReportFormat>,

    /// Enable verbose debug logging
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// The debug log format [default: pretty]
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// The debug log filter [default: bwprobe=debug,bwprobe_core=debug]
    #[arg(long)]
    pub log_filter: Option<String>,

    /// The debug log span events [default: off]
    #[arg(long)]
    pub log_span_events: Option<LogSpanEvents>,
}
