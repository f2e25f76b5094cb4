use crate::config::Policy;
use crate::error::Result;
use crate::message::Inbound;
use crate::payload::ProbePayload;
use crate::state::SessionProbe;
use crate::strategy::{Action, Strategy};
use crate::transport::{Clock, MonotonicClock, Transport};
use crate::types::Transaction;
use bwprobe_amf::command::Command;
use std::sync::Arc;
use tracing::instrument;

/// A bandwidth detector.
///
/// A single `Detector` serves every session of a configuration scope, the
/// per-session state lives in the [`SessionProbe`] passed to each operation.
///
/// Use the [`crate::Builder`] type to create a [`Detector`].
///
/// Note that this type is cheaply cloneable.
#[derive(Debug)]
pub struct Detector<C = MonotonicClock> {
    inner: Arc<Strategy<C>>,
}

impl<C> Clone for Detector<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock> Detector<C> {
    pub(crate) fn new(policy: Policy, payload: ProbePayload, clock: C) -> Self {
        Self {
            inner: Arc::new(Strategy::new(policy, payload, clock)),
        }
    }

    /// The probing policy.
    #[must_use]
    pub fn policy(&self) -> &Policy {
        self.inner.policy()
    }

    /// The payload carried by every throughput probe.
    #[must_use]
    pub fn payload(&self) -> &ProbePayload {
        self.inner.payload()
    }

    /// Start a probing episode.
    ///
    /// Returns [`Action::Rejected`] if the connection is a relay, probing is
    /// disabled, `has_body` is false or an episode is already in progress.
    ///
    /// # See Also
    ///
    /// - [`Detector::dispatch`] - Dispatch a decoded inbound command.
    pub fn start_episode<T: Transport>(
        &self,
        probe: &mut SessionProbe,
        transport: &mut T,
        has_body: bool,
    ) -> Result<Action> {
        self.inner.start_episode(probe, transport, has_body)
    }

    /// Process a probe acknowledgement.
    pub fn on_reply<T: Transport>(
        &self,
        probe: &mut SessionProbe,
        transport: &mut T,
    ) -> Result<Action> {
        self.inner.on_reply(probe, transport)
    }

    /// Process a `_result` reply with the given transaction.
    pub fn on_result<T: Transport>(
        &self,
        probe: &mut SessionProbe,
        transport: &mut T,
        transaction: Transaction,
    ) -> Result<Action> {
        self.inner.on_result(probe, transport, transaction)
    }

    /// Process an `_error` reply with the given transaction.
    #[must_use]
    pub fn on_error(&self, probe: &SessionProbe, transaction: Transaction) -> Action {
        self.inner.on_error(probe, transaction)
    }

    /// Dispatch a decoded inbound command to the matching operation.
    pub fn dispatch<T: Transport>(
        &self,
        probe: &mut SessionProbe,
        transport: &mut T,
        msg: &Inbound,
    ) -> Result<Action> {
        match msg {
            Inbound::Start { has_body } => self.start_episode(probe, transport, *has_body),
            Inbound::Result { transaction, count } => {
                tracing::trace!(?transaction, ?count, "result");
                self.on_result(probe, transport, *transaction)
            }
            Inbound::Error { transaction } => Ok(self.on_error(probe, *transaction)),
            Inbound::Other(_) => Ok(Action::NoAction),
        }
    }

    /// Decode and dispatch a raw inbound AMF0 command.
    ///
    /// A command which cannot be decoded is logged and dropped, the session
    /// is unaffected.
    #[instrument(skip_all, level = "trace")]
    pub fn handle<T: Transport>(
        &self,
        probe: &mut SessionProbe,
        transport: &mut T,
        buf: &[u8],
    ) -> Result<Action> {
        let decoded = Command::decode(buf)
            .map_err(crate::Error::from)
            .and_then(|cmd| Inbound::try_from(&cmd));
        match decoded {
            Ok(msg) => self.dispatch(probe, transport, &msg),
            Err(err) => {
                tracing::warn!(%err, len = buf.len(), "dropping inbound command");
                Ok(Action::NoAction)
            }
        }
    }
}
