use crate::config::Policy;
use crate::error::{RejectReason, Result};
use crate::payload::ProbePayload;
use crate::state::{Phase, SessionProbe};
use crate::transport::{Clock, Transport};
use crate::types::{Millis, Transaction};
use tracing::instrument;

/// The outcome of a probing episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// The estimated downstream throughput in kilobits per second.
    pub kbps: f64,
    /// The number of kilobits sent during the episode.
    pub kilobits: f64,
    /// The measurement window in seconds, net of latency overhead.
    pub seconds: f64,
    /// The estimated latency.
    pub latency: Millis,
}

/// The action taken in response to an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// A new episode was started and the latency probe sent.
    Started,
    /// The episode was not started.
    Rejected(RejectReason),
    /// A throughput probe was sent.
    ProbeSent,
    /// The estimate was computed and sent to the peer.
    Finalized(Estimate),
    /// The peer acknowledged the estimate and the episode ended.
    Completed,
    /// The event was ignored.
    NoAction,
}

/// The probing state machine.
///
/// A `Strategy` holds no per-session state, every operation acts on the
/// [`SessionProbe`] of the connection which received the event.
#[derive(Debug)]
pub struct Strategy<C> {
    policy: Policy,
    payload: ProbePayload,
    clock: C,
}

impl<C: Clock> Strategy<C> {
    #[instrument(skip_all, level = "trace")]
    pub fn new(policy: Policy, payload: ProbePayload, clock: C) -> Self {
        tracing::debug!(?policy);
        Self {
            policy,
            payload,
            clock,
        }
    }

    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    pub const fn payload(&self) -> &ProbePayload {
        &self.payload
    }

    /// Start a probing episode.
    ///
    /// An episode is not started if any of the following are true:
    ///
    /// 1 - the connection is a relay
    /// 2 - probing is disabled
    /// 3 - the start command carried no body
    /// 4 - an episode is already in progress for this session
    ///
    /// The session state is not created or mutated for the first three cases.
    #[instrument(skip(self, probe, transport), level = "trace")]
    pub fn start_episode<T: Transport>(
        &self,
        probe: &mut SessionProbe,
        transport: &mut T,
        has_body: bool,
    ) -> Result<Action> {
        let reject = if transport.is_relay() {
            Some(RejectReason::Relay)
        } else if !self.policy.is_enabled() {
            Some(RejectReason::Disabled)
        } else if !has_body {
            Some(RejectReason::MissingBody)
        } else {
            None
        };
        if let Some(reason) = reject {
            tracing::debug!(%reason, "episode rejected");
            return Ok(Action::Rejected(reason));
        }
        let state = probe.get_or_create();
        if state.is_active() {
            tracing::debug!(phase = ?state.phase(), "episode already active");
            return Ok(Action::Rejected(RejectReason::AlreadyActive));
        }
        let now = self.clock.now();
        let bytes_out = transport.bytes_out();
        state.begin(now, Millis::from(self.policy.latency_min), bytes_out);
        tracing::debug!(%now, bytes_out, "episode started");
        transport.send_probe(None)?;
        Ok(Action::Started)
    }

    /// Process a probe acknowledgement.
    ///
    /// The first reply measures the latency and is always followed by a
    /// throughput probe.  The second reply is followed by one more throughput
    /// probe if the test duration has not elapsed.  The episode is finalized
    /// once every probe sent has been acknowledged.
    ///
    /// Replies received when no episode is active, or after the estimate has
    /// been sent, are ignored.
    #[instrument(skip(self, probe, transport), level = "trace")]
    pub fn on_reply<T: Transport>(
        &self,
        probe: &mut SessionProbe,
        transport: &mut T,
    ) -> Result<Action> {
        let Some(state) = probe.active_mut() else {
            tracing::debug!("reply without active episode");
            return Ok(Action::NoAction);
        };
        if state.phase() == Phase::AwaitingDoneAck {
            tracing::debug!("reply after estimate sent");
            return Ok(Action::NoAction);
        }
        let now = self.clock.now();
        let elapsed = state.record_reply(now, &self.policy);
        tracing::debug!(
            %elapsed,
            replies = state.replies_received(),
            sent = state.probes_sent(),
            latency = %state.latency(),
        );
        match state.phase() {
            Phase::AwaitingFirstReply => {
                state.bootstrap_probe();
                transport.send_probe(Some(self.payload.clone()))?;
                Ok(Action::ProbeSent)
            }
            Phase::Probing
                if state.replies_received() == 2
                    && elapsed < Millis::from(self.policy.test_duration) =>
            {
                state.extend_probe();
                transport.send_probe(Some(self.payload.clone()))?;
                Ok(Action::ProbeSent)
            }
            Phase::Probing if state.all_replied() => {
                let estimate = state.finalize(now, transport.bytes_out(), &self.policy);
                tracing::debug!(?estimate, "episode finalized");
                transport.send_result(&estimate)?;
                Ok(Action::Finalized(estimate))
            }
            _ => Ok(Action::NoAction),
        }
    }

    /// Process a `_result` reply.
    ///
    /// Replies on relay connections and replies with a foreign transaction id
    /// are ignored.
    #[instrument(skip(self, probe, transport), level = "trace")]
    pub fn on_result<T: Transport>(
        &self,
        probe: &mut SessionProbe,
        transport: &mut T,
        transaction: Transaction,
    ) -> Result<Action> {
        if transport.is_relay() {
            return Ok(Action::NoAction);
        }
        match transaction {
            Transaction::Check => self.on_reply(probe, transport),
            Transaction::Done => Ok(Self::complete(probe)),
            Transaction::Other(id) => {
                tracing::trace!(id, "ignoring foreign transaction");
                Ok(Action::NoAction)
            }
        }
    }

    /// Process an `_error` reply.
    ///
    /// The error is logged only, an in-progress episode is unaffected.  Errors
    /// for transactions other than the probe and done transactions are
    /// logged at debug.
    #[instrument(skip(self, probe), level = "trace")]
    pub fn on_error(&self, probe: &SessionProbe, transaction: Transaction) -> Action {
        let active = probe.is_active();
        match transaction {
            Transaction::Check | Transaction::Done => tracing::warn!(
                transaction = transaction.id(),
                active,
                "peer returned error"
            ),
            Transaction::Other(id) => {
                tracing::debug!(transaction = id, active, "peer returned error");
            }
        }
        Action::NoAction
    }

    fn complete(probe: &mut SessionProbe) -> Action {
        match probe.active_mut() {
            Some(state) => {
                tracing::debug!(phase = ?state.phase(), "episode completed");
                state.end();
                Action::Completed
            }
            None => Action::NoAction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::{ManualClock, MockTransport};
    use mockall::predicate::always;
    use mockall::Sequence;
    use std::time::Duration;
    use test_case::test_case;
    use tracing_test::traced_test;

    fn strategy(clock: &ManualClock) -> Strategy<ManualClock> {
        strategy_with(Policy::default(), clock)
    }

    fn strategy_with(policy: Policy, clock: &ManualClock) -> Strategy<ManualClock> {
        Strategy::new(policy, ProbePayload::from(vec![0xab; 16]), clock.clone())
    }

    fn transport() -> MockTransport {
        let mut transport = MockTransport::new();
        transport.expect_is_relay().return_const(false);
        transport
    }

    /// Start an episode, expecting exactly one empty probe.
    fn started(
        strategy: &Strategy<ManualClock>,
        transport: &mut MockTransport,
        bytes_out: u64,
    ) -> anyhow::Result<SessionProbe> {
        let mut seq = Sequence::new();
        transport
            .expect_bytes_out()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(bytes_out);
        transport
            .expect_send_probe()
            .withf(Option::is_none)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let mut probe = SessionProbe::new();
        assert_eq!(
            Action::Started,
            strategy.start_episode(&mut probe, transport, true)?
        );
        transport.checkpoint();
        transport.expect_is_relay().return_const(false);
        Ok(probe)
    }

    #[test]
    fn test_start_episode() -> anyhow::Result<()> {
        let clock = ManualClock::new(Millis(500));
        let strategy = strategy(&clock);
        let mut transport = transport();
        let probe = started(&strategy, &mut transport, 1000)?;
        let state = probe.state().expect("state");
        assert!(state.is_active());
        assert_eq!(Phase::AwaitingFirstReply, state.phase());
        assert_eq!(Millis(500), state.episode_start());
        assert_eq!(1, state.probes_sent());
        assert_eq!(0, state.replies_received());
        assert_eq!(Millis(10), state.latency());
        assert_eq!(1000, state.bytes_out_at_start());
        Ok(())
    }

    #[test]
    fn test_start_episode_idempotent() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        let mut probe = started(&strategy, &mut transport, 0)?;
        transport.expect_send_probe().never();
        transport.expect_bytes_out().never();
        clock.advance(Millis(5));
        assert_eq!(
            Action::Rejected(RejectReason::AlreadyActive),
            strategy.start_episode(&mut probe, &mut transport, true)?
        );
        let state = probe.state().expect("state");
        assert_eq!(1, state.probes_sent());
        assert_eq!(Millis(0), state.episode_start());
        Ok(())
    }

    #[test]
    fn test_start_episode_relay() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = MockTransport::new();
        transport.expect_is_relay().return_const(true);
        transport.expect_send_probe().never();
        let mut probe = SessionProbe::new();
        assert_eq!(
            Action::Rejected(RejectReason::Relay),
            strategy.start_episode(&mut probe, &mut transport, true)?
        );
        assert!(probe.state().is_none());
        Ok(())
    }

    #[test]
    fn test_start_episode_disabled() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let policy = Policy {
            test_duration: Duration::ZERO,
            ..Default::default()
        };
        let strategy = strategy_with(policy, &clock);
        let mut transport = transport();
        transport.expect_send_probe().never();
        let mut probe = SessionProbe::new();
        assert_eq!(
            Action::Rejected(RejectReason::Disabled),
            strategy.start_episode(&mut probe, &mut transport, true)?
        );
        assert!(probe.state().is_none());
        Ok(())
    }

    #[test]
    fn test_start_episode_missing_body() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        transport.expect_send_probe().never();
        let mut probe = SessionProbe::new();
        assert_eq!(
            Action::Rejected(RejectReason::MissingBody),
            strategy.start_episode(&mut probe, &mut transport, false)?
        );
        assert!(probe.state().is_none());
        Ok(())
    }

    #[test]
    fn test_start_episode_send_failure() {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        transport.expect_bytes_out().return_const(0_u64);
        transport
            .expect_send_probe()
            .times(1)
            .returning(|_| Err(Error::SendFailed("onBWCheck", String::from("queue full"))));
        let mut probe = SessionProbe::new();
        let err = strategy
            .start_episode(&mut probe, &mut transport, true)
            .unwrap_err();
        assert!(matches!(err, Error::SendFailed("onBWCheck", _)));
        assert!(probe.is_active());
    }

    #[test]
    fn test_reply_without_episode() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        transport.expect_send_probe().never();
        transport.expect_send_result().never();
        let mut probe = SessionProbe::new();
        assert_eq!(
            Action::NoAction,
            strategy.on_reply(&mut probe, &mut transport)?
        );
        assert!(probe.state().is_none());
        Ok(())
    }

    #[test]
    fn test_concrete_episode() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        let mut probe = started(&strategy, &mut transport, 1000)?;

        transport
            .expect_send_probe()
            .withf(|payload| payload.as_ref().is_some_and(|p| p.len() == 16))
            .times(2)
            .returning(|_| Ok(()));
        clock.set(Millis(50));
        assert_eq!(
            Action::ProbeSent,
            strategy.on_reply(&mut probe, &mut transport)?
        );
        let state = probe.state().expect("state");
        assert_eq!(Millis(50), state.latency());
        assert_eq!(2, state.probes_sent());
        assert_eq!(0, state.cumulative_latency_units());

        clock.set(Millis(60));
        assert_eq!(
            Action::ProbeSent,
            strategy.on_reply(&mut probe, &mut transport)?
        );
        let state = probe.state().expect("state");
        assert_eq!(3, state.probes_sent());
        assert_eq!(1, state.cumulative_latency_units());
        assert_eq!(Millis(60), state.second_reply());

        transport.expect_bytes_out().times(1).return_const(2_001_000_u64);
        transport
            .expect_send_result()
            .with(always())
            .times(1)
            .returning(|_| Ok(()));
        clock.set(Millis(2100));
        let Action::Finalized(estimate) = strategy.on_reply(&mut probe, &mut transport)? else {
            panic!("expected finalized");
        };
        assert!((estimate.kbps - 7804.878).abs() < 1e-3);
        assert!((estimate.kilobits - 16_000.0).abs() < 1e-9);
        assert!((estimate.seconds - 2.05).abs() < 1e-9);
        assert_eq!(Millis(50), estimate.latency);
        assert!(probe.is_active());
        assert_eq!(
            Some(Phase::AwaitingDoneAck),
            probe.state().map(|s| s.phase())
        );
        Ok(())
    }

    #[test_case(3, 200; "finalize on third reply")]
    #[test_case(2, 5000; "finalize on second reply when test duration elapsed")]
    fn test_finalize_condition(replies: u32, second_reply_at: u64) -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        let mut probe = started(&strategy, &mut transport, 0)?;
        transport.expect_send_probe().returning(|_| Ok(()));
        transport.expect_bytes_out().return_const(32_768_u64);
        transport.expect_send_result().times(1).returning(|_| Ok(()));
        let times = [20, second_reply_at, second_reply_at + 100];
        for (i, at) in times.iter().take(replies as usize).enumerate() {
            clock.set(Millis(*at));
            let action = strategy.on_reply(&mut probe, &mut transport)?;
            let last = i + 1 == replies as usize;
            assert_eq!(last, matches!(action, Action::Finalized(_)), "reply {i}");
        }
        let state = probe.state().expect("state");
        assert_eq!(replies, state.probes_sent());
        assert_eq!(replies, state.replies_received());
        Ok(())
    }

    #[test]
    fn test_replies_after_finalize_ignored() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        let mut probe = started(&strategy, &mut transport, 0)?;
        transport.expect_send_probe().times(1).returning(|_| Ok(()));
        transport.expect_bytes_out().return_const(0_u64);
        transport.expect_send_result().times(1).returning(|_| Ok(()));
        clock.set(Millis(3000));
        assert_eq!(
            Action::ProbeSent,
            strategy.on_reply(&mut probe, &mut transport)?
        );
        clock.set(Millis(3100));
        assert!(matches!(
            strategy.on_reply(&mut probe, &mut transport)?,
            Action::Finalized(_)
        ));
        let before = probe.state().cloned();
        assert_eq!(
            Action::NoAction,
            strategy.on_reply(&mut probe, &mut transport)?
        );
        assert_eq!(before.as_ref(), probe.state());
        Ok(())
    }

    #[test]
    fn test_finalize_send_failure() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        let mut probe = started(&strategy, &mut transport, 0)?;
        transport.expect_send_probe().times(1).returning(|_| Ok(()));
        transport.expect_bytes_out().return_const(0_u64);
        transport
            .expect_send_result()
            .times(1)
            .returning(|_| Err(Error::SendFailed("onBWDone", String::from("closed"))));
        clock.set(Millis(3000));
        strategy.on_reply(&mut probe, &mut transport)?;
        clock.set(Millis(3100));
        assert!(strategy.on_reply(&mut probe, &mut transport).is_err());
        assert_eq!(
            Some(Phase::AwaitingDoneAck),
            probe.state().map(|s| s.phase())
        );
        Ok(())
    }

    #[test]
    fn test_on_result_done_completes() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        let mut probe = started(&strategy, &mut transport, 0)?;
        assert_eq!(
            Action::Completed,
            strategy.on_result(&mut probe, &mut transport, Transaction::Done)?
        );
        assert!(!probe.is_active());
        assert_eq!(
            Action::NoAction,
            strategy.on_result(&mut probe, &mut transport, Transaction::Done)?
        );
        Ok(())
    }

    #[test]
    fn test_on_result_foreign_transaction() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        let mut probe = started(&strategy, &mut transport, 0)?;
        transport.expect_send_probe().never();
        let before = probe.state().cloned();
        assert_eq!(
            Action::NoAction,
            strategy.on_result(&mut probe, &mut transport, Transaction::Other(1))?
        );
        assert_eq!(before.as_ref(), probe.state());
        Ok(())
    }

    #[test]
    fn test_on_result_relay_ignored() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = MockTransport::new();
        transport.expect_is_relay().return_const(true);
        transport.expect_send_probe().never();
        let mut probe = SessionProbe::new();
        assert_eq!(
            Action::NoAction,
            strategy.on_result(&mut probe, &mut transport, Transaction::Check)?
        );
        Ok(())
    }

    #[test]
    fn test_on_error_leaves_episode() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        let probe = started(&strategy, &mut transport, 0)?;
        let before = probe.state().cloned();
        assert_eq!(
            Action::NoAction,
            strategy.on_error(&probe, Transaction::Check)
        );
        assert_eq!(before.as_ref(), probe.state());
        Ok(())
    }

    #[test]
    #[traced_test]
    fn test_on_error_log_level() {
        let strategy = strategy(&ManualClock::default());
        let probe = SessionProbe::new();
        for transaction in [
            Transaction::Check,
            Transaction::Done,
            Transaction::Other(7),
        ] {
            assert_eq!(Action::NoAction, strategy.on_error(&probe, transaction));
        }
        logs_assert(|lines: &[&str]| {
            let levels = lines
                .iter()
                .filter(|line| line.contains("peer returned error"))
                .map(|line| {
                    if line.contains("WARN") {
                        "WARN"
                    } else if line.contains("DEBUG") {
                        "DEBUG"
                    } else {
                        "OTHER"
                    }
                })
                .collect::<Vec<_>>();
            if levels == ["WARN", "WARN", "DEBUG"] {
                Ok(())
            } else {
                Err(format!("unexpected levels {levels:?}"))
            }
        });
    }

    #[test]
    fn test_restart_after_completion() -> anyhow::Result<()> {
        let clock = ManualClock::default();
        let strategy = strategy(&clock);
        let mut transport = transport();
        let mut probe = started(&strategy, &mut transport, 0)?;
        strategy.on_result(&mut probe, &mut transport, Transaction::Done)?;
        transport.expect_bytes_out().return_const(4096_u64);
        transport
            .expect_send_probe()
            .withf(Option::is_none)
            .times(1)
            .returning(|_| Ok(()));
        clock.set(Millis(9000));
        assert_eq!(
            Action::Started,
            strategy.start_episode(&mut probe, &mut transport, true)?
        );
        let state = probe.state().expect("state");
        assert_eq!(Millis(9000), state.episode_start());
        assert_eq!(4096, state.bytes_out_at_start());
        Ok(())
    }
}
