#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
#![forbid(unsafe_code)]

use clap::Parser;
use config::{Args, BwprobeConfig};

mod app;
mod config;
mod report;
mod sim;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = BwprobeConfig::from(args)?;
    app::run_bwprobe(&cfg)
}
