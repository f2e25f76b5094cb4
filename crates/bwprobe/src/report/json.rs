use crate::config::BwprobeConfig;
use crate::report::types::Report;
use crate::sim::SimOutcome;
use std::io::Write;
use tracing::instrument;

/// Generate a json report of a simulated episode.
#[instrument(skip_all, level = "trace")]
pub fn report<W: Write>(
    writer: W,
    cfg: &BwprobeConfig,
    outcome: &SimOutcome,
) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, &Report::new(cfg, outcome))?;
    Ok(())
}
