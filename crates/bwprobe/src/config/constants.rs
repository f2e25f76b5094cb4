use crate::config::{LogFormat, LogSpanEvents, ReportFormat};
use std::time::Duration;

/// The default value for `log-format`.
pub const DEFAULT_LOG_FORMAT: LogFormat = LogFormat::Pretty;

/// The default value for `log-span-events`.
pub const DEFAULT_LOG_SPAN_EVENTS: LogSpanEvents = LogSpanEvents::Off;

/// The default value for `log-filter`.
pub const DEFAULT_LOG_FILTER: &str = "bwprobe=debug,bwprobe_core=debug";

/// The default value for `report-format`.
pub const DEFAULT_REPORT_FORMAT: ReportFormat = ReportFormat::Text;

/// The default value for `link-latency`.
pub const DEFAULT_LINK_LATENCY: Duration = Duration::from_millis(25);

/// The default value for `bandwidth`, in kilobits per second.
pub const DEFAULT_LINK_BANDWIDTH: u64 = 10_000;

/// The default value for `relay`.
pub const DEFAULT_LINK_RELAY: bool = false;
