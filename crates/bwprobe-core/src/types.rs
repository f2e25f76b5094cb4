use crate::constants::{CHECK_TRANSACTION, DONE_TRANSACTION};
use derive_more::{Add, Display, From, Sub};
use std::time::Duration;

/// A millisecond timestamp or duration newtype.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Add, Sub, From, Display,
)]
#[display("{_0}ms")]
pub struct Millis(pub u64);

impl Millis {
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<Duration> for Millis {
    fn from(duration: Duration) -> Self {
        Self(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

impl From<Millis> for Duration {
    fn from(millis: Millis) -> Self {
        Self::from_millis(millis.0)
    }
}

/// The kind of a reply, determined from its transaction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// A probe acknowledgement.
    Check,
    /// The acknowledgement of the final estimate.
    Done,
    /// A transaction which does not belong to bandwidth probing.
    Other(i64),
}

impl From<f64> for Transaction {
    fn from(id: f64) -> Self {
        match id as i64 {
            CHECK_TRANSACTION => Self::Check,
            DONE_TRANSACTION => Self::Done,
            other => Self::Other(other),
        }
    }
}

impl Transaction {
    /// The wire transaction id.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Check => CHECK_TRANSACTION,
            Self::Done => DONE_TRANSACTION,
            Self::Other(id) => id,
        }
    }
}
