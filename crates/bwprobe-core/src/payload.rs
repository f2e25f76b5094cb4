use rand::RngCore;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// The body carried by every throughput probe.
///
/// Generated once and shared read-only by all sessions, cloning only bumps a
/// reference count.
#[derive(Clone, PartialEq, Eq)]
pub struct ProbePayload(Arc<[u8]>);

impl ProbePayload {
    /// Generate a payload of `len` pseudo-random bytes.
    #[must_use]
    pub fn generate(len: usize) -> Self {
        let mut bytes = vec![0_u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(Arc::from(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for ProbePayload {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<u8>> for ProbePayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Arc::from(bytes))
    }
}

impl Debug for ProbePayload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProbePayload({} bytes)", self.0.len())
    }
}
