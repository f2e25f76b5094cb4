use thiserror::Error;

/// A probing error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A probing error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid config: {0}")]
    BadConfig(String),
    #[error("failed to decode command: {0}")]
    Decode(#[from] bwprobe_amf::error::Error),
    #[error("failed to encode {0}: {1}")]
    Encode(&'static str, bwprobe_amf::error::Error),
    #[error("malformed {0} command: {1}")]
    Malformed(&'static str, String),
    #[error("failed to send {0}: {1}")]
    SendFailed(&'static str, String),
}

/// Why an episode was not started.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RejectReason {
    /// The connection is itself a relay.
    Relay,
    /// The test duration is zero.
    Disabled,
    /// The start command carried no body.
    MissingBody,
    /// An episode is already in progress.
    AlreadyActive,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Relay => write!(f, "relay connection"),
            Self::Disabled => write!(f, "probing disabled"),
            Self::MissingBody => write!(f, "missing body"),
            Self::AlreadyActive => write!(f, "already active"),
        }
    }
}
