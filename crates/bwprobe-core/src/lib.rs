//! Bandwidth and latency probing over an established streaming session.
//!
//! A probing episode estimates the downstream throughput and round trip
//! latency of a single session by sending a short burst of probes and timing
//! the acknowledgements.  An episode proceeds as follows:
//!
//! 1 - an empty probe is sent to measure latency
//! 2 - when it is acknowledged a probe carrying a 16 KiB payload is sent
//! 3 - when that is acknowledged, one more payload probe is sent if the test
//!     duration has not elapsed
//! 4 - once every probe has been acknowledged the estimate is computed and
//!     sent to the peer
//! 5 - the episode ends when the peer acknowledges the estimate
//!
//! The caller owns the connection and supplies it via the [`Transport`]
//! trait, together with the [`SessionProbe`] belonging to that connection.
//!
//! # Example
//!
//! The following example builds a detector with the default policy and
//! starts an episode on a connection:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use bwprobe_core::{Action, Builder, Estimate, ProbePayload, SessionProbe, Transport};
//!
//! #[derive(Default)]
//! struct Connection {
//!     sent: Vec<Option<ProbePayload>>,
//! }
//!
//! impl Transport for Connection {
//!     fn send_probe(&mut self, payload: Option<ProbePayload>) -> bwprobe_core::Result<()> {
//!         self.sent.push(payload);
//!         Ok(())
//!     }
//!     fn send_result(&mut self, _estimate: &Estimate) -> bwprobe_core::Result<()> {
//!         Ok(())
//!     }
//!     fn bytes_out(&self) -> u64 {
//!         0
//!     }
//!     fn is_relay(&self) -> bool {
//!         false
//!     }
//! }
//!
//! let detector = Builder::new().build()?;
//! let mut conn = Connection::default();
//! let mut probe = SessionProbe::new();
//! assert_eq!(Action::Started, detector.start_episode(&mut probe, &mut conn, true)?);
//! assert_eq!(vec![None], conn.sent);
//! # Ok(())
//! # }
//! ```
//!
//! # See Also
//!
//! - [`Builder`] - Build a [`Detector`].
//! - [`Detector::handle`] - Decode and dispatch a raw inbound command.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![forbid(unsafe_code)]

mod builder;
mod config;
mod constants;
mod detector;
mod error;
mod message;
mod payload;
mod state;
mod strategy;
mod transport;
mod types;

pub use builder::Builder;
pub use config::{defaults, Policy, PolicyOverrides};
pub use constants::{
    inbound, outbound, CHECK_TRANSACTION, DONE_TRANSACTION, PAYLOAD_LENGTH,
    UNDEFINED_LATENCY_GAP,
};
pub use detector::Detector;
pub use error::{Error, RejectReason, Result};
pub use message::{check_command, done_command, encode_command, Inbound};
pub use payload::ProbePayload;
pub use state::{Phase, SessionProbe, SessionProbeState};
pub use strategy::{Action, Estimate};
pub use transport::{Clock, ManualClock, MonotonicClock, Transport};
pub use types::{Millis, Transaction};
