use crate::types::Millis;

/// The length of the payload carried by every throughput probe.
pub const PAYLOAD_LENGTH: usize = 16 * 1024;

/// The transaction id which correlates probes and their acknowledgements.
pub const CHECK_TRANSACTION: i64 = 3;

/// The transaction id which correlates the result and its acknowledgement.
pub const DONE_TRANSACTION: i64 = 4;

/// The gap between the first and second reply above which a high latency link
/// is assumed to be satellite or modem class.
pub const UNDEFINED_LATENCY_GAP: Millis = Millis(1000);

/// The smallest measurement window used when computing throughput.
///
/// This is the resolution of the clock, a window of zero would otherwise
/// yield an infinite throughput.
pub const MIN_ELAPSED: Millis = Millis(1);

/// Outbound command names.
pub mod outbound {
    /// A probe sent to the peer.
    pub const CHECK: &str = "onBWCheck";
    /// The final estimate sent to the peer.
    pub const DONE: &str = "onBWDone";
}

/// Inbound command names.
pub mod inbound {
    /// Start an episode.
    pub const CHECK_BANDWIDTH: &str = "checkBandwidth";
    /// Start an episode (alternate client convention).
    pub const ON_CLIENT_BW_CHECK: &str = "onClientBWCheck";
    /// A reply to a prior invocation.
    pub const RESULT: &str = "_result";
    /// An error reply to a prior invocation.
    pub const ERROR: &str = "_error";
}
