use crate::config::BwprobeConfig;
use crate::report::types::Report;
use crate::sim::SimOutcome;
use std::io::Write;
use tracing::instrument;

/// Generate a human readable report of a simulated episode.
#[instrument(skip_all, level = "trace")]
pub fn report<W: Write>(
    mut writer: W,
    cfg: &BwprobeConfig,
    outcome: &SimOutcome,
) -> anyhow::Result<()> {
    let report = Report::new(cfg, outcome);
    let policy = &report.info.policy;
    let link = &report.info.link;
    if let Some(app) = &report.info.app {
        writeln!(writer, "app:       {app}")?;
    }
    writeln!(
        writer,
        "policy:    latency {}..{}ms, undefined {}ms, test time {}ms",
        policy.latency_min_ms, policy.latency_max_ms, policy.latency_undef_ms, policy.test_time_ms
    )?;
    writeln!(
        writer,
        "link:      {}ms one-way, {} kbps{}",
        link.latency_ms,
        link.bandwidth_kbps,
        if link.relay { ", relay" } else { "" }
    )?;
    for event in &report.events {
        writeln!(writer, "{:>8}ms  {}", event.at_ms, event.action)?;
    }
    writeln!(
        writer,
        "outcome:   {} after {} probes, {} bytes sent",
        report.outcome, report.probes_sent, report.bytes_out
    )?;
    if let Some(estimate) = &report.estimate {
        writeln!(
            writer,
            "estimate:  {:.2} kbps ({:.2} kbit in {:.3}s), latency {}ms",
            estimate.kbps, estimate.kilobits, estimate.seconds, estimate.latency_ms
        )?;
    }
    Ok(())
}
