use crate::config::{BwprobeConfig, LogFormat, LogSpanEvents, ReportFormat};
use crate::report;
use crate::sim::Simulation;
use tracing_subscriber::fmt::format::FmtSpan;

/// Run the bwprobe application.
pub fn run_bwprobe(cfg: &BwprobeConfig) -> anyhow::Result<()> {
    configure_logging(cfg);
    tracing::debug!(?cfg);
    let outcome = Simulation::new(cfg.policy, cfg.link)?.run()?;
    let stdout = std::io::stdout().lock();
    match cfg.report_format {
        ReportFormat::Text => report::text::report(stdout, cfg, &outcome),
        ReportFormat::Json => report::json::report(stdout, cfg, &outcome),
    }
}

fn configure_logging(cfg: &BwprobeConfig) {
    if cfg.verbose {
        let fmt_span = match cfg.log_span_events {
            LogSpanEvents::Off => FmtSpan::NONE,
            LogSpanEvents::Active => FmtSpan::ACTIVE,
            LogSpanEvents::Full => FmtSpan::FULL,
        };
        match cfg.log_format {
            LogFormat::Compact => {
                tracing_subscriber::fmt()
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .with_writer(std::io::stderr)
                    .compact()
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::fmt()
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .with_writer(std::io::stderr)
                    .pretty()
                    .init();
            }
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .with_writer(std::io::stderr)
                    .json()
                    .init();
            }
        }
    }
}
