use bwprobe_amf::command::Command;
use bwprobe_amf::value::Value;
use bwprobe_core::{
    check_command, done_command, encode_command, Action, Builder, Detector, Estimate, ManualClock,
    Millis, Phase, ProbePayload, RejectReason, SessionProbe, Transport, PAYLOAD_LENGTH,
};
use std::time::Duration;

/// A connection which encodes every outbound command and counts the bytes.
#[derive(Default)]
struct Connection {
    relay: bool,
    bytes_out: u64,
    sent: Vec<Command>,
}

impl Connection {
    fn push(&mut self, cmd: Command) -> bwprobe_core::Result<()> {
        self.bytes_out += encode_command(&cmd)?.len() as u64;
        self.sent.push(cmd);
        Ok(())
    }
}

impl Transport for Connection {
    fn send_probe(&mut self, payload: Option<ProbePayload>) -> bwprobe_core::Result<()> {
        self.push(check_command(payload.as_ref()))
    }

    fn send_result(&mut self, estimate: &Estimate) -> bwprobe_core::Result<()> {
        self.push(done_command(estimate))
    }

    fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    fn is_relay(&self) -> bool {
        self.relay
    }
}

fn detector(clock: &ManualClock) -> anyhow::Result<Detector<ManualClock>> {
    Ok(Builder::new().build_with_clock(clock.clone())?)
}

fn reply(transaction: f64, count: f64) -> anyhow::Result<Vec<u8>> {
    Ok(Command::new("_result", transaction, vec![Value::Null, Value::Number(count)]).encode()?)
}

#[test]
fn test_full_episode() -> anyhow::Result<()> {
    let clock = ManualClock::default();
    let detector = detector(&clock)?;
    let mut conn = Connection {
        bytes_out: 1000,
        ..Default::default()
    };
    let mut probe = SessionProbe::new();

    let start = Command::new("onClientBWCheck", 0.0, vec![Value::Null]).encode()?;
    assert_eq!(
        Action::Started,
        detector.handle(&mut probe, &mut conn, &start)?
    );
    clock.set(Millis(50));
    assert_eq!(
        Action::ProbeSent,
        detector.handle(&mut probe, &mut conn, &reply(3.0, 1.0)?)?
    );
    clock.set(Millis(60));
    assert_eq!(
        Action::ProbeSent,
        detector.handle(&mut probe, &mut conn, &reply(3.0, 2.0)?)?
    );
    clock.set(Millis(2100));
    let Action::Finalized(estimate) = detector.handle(&mut probe, &mut conn, &reply(3.0, 3.0)?)?
    else {
        panic!("expected finalized");
    };

    let probe_len = check_command(Some(detector.payload())).encoded_len() as f64;
    let empty_len = check_command(None).encoded_len() as f64;
    let expected_kilobits = (empty_len + 2.0 * probe_len) * 8.0 / 1000.0;
    assert!((estimate.kilobits - expected_kilobits).abs() < 1e-9);
    assert!((estimate.seconds - 2.05).abs() < 1e-9);
    assert!((estimate.kbps - expected_kilobits / 2.05).abs() < 1e-9);
    assert_eq!(Millis(50), estimate.latency);

    let names = conn
        .sent
        .iter()
        .map(|cmd| cmd.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        vec!["onBWCheck", "onBWCheck", "onBWCheck", "onBWDone"],
        names
    );
    assert_eq!(Some(&Value::String(vec![])), conn.sent[0].arg(1));
    assert_eq!(
        Some(PAYLOAD_LENGTH),
        conn.sent[1].arg(1).map(|v| match v {
            Value::String(bytes) => bytes.len(),
            _ => 0,
        })
    );
    assert_eq!(Some(4.0), conn.sent[3].transaction_id);
    assert_eq!(Ok(50.0), conn.sent[3].number_at(4));

    assert!(probe.is_active());
    assert_eq!(
        Action::Completed,
        detector.handle(&mut probe, &mut conn, &reply(4.0, 0.0)?)?
    );
    assert!(!probe.is_active());
    assert_eq!(Some(Phase::Idle), probe.state().map(|s| s.phase()));
    Ok(())
}

#[test]
fn test_relay_never_probed() -> anyhow::Result<()> {
    let clock = ManualClock::default();
    let detector = detector(&clock)?;
    let mut conn = Connection {
        relay: true,
        ..Default::default()
    };
    let mut probe = SessionProbe::new();
    assert_eq!(
        Action::Rejected(RejectReason::Relay),
        detector.start_episode(&mut probe, &mut conn, true)?
    );
    assert_eq!(
        Action::NoAction,
        detector.handle(&mut probe, &mut conn, &reply(3.0, 1.0)?)?
    );
    assert!(conn.sent.is_empty());
    Ok(())
}

#[test]
fn test_lost_probe_stalls_episode() -> anyhow::Result<()> {
    let clock = ManualClock::default();
    let detector = detector(&clock)?;
    let mut conn = Connection::default();
    let mut probe = SessionProbe::new();
    detector.start_episode(&mut probe, &mut conn, true)?;
    clock.set(Millis(30));
    detector.on_reply(&mut probe, &mut conn)?;
    clock.set(Millis(40));
    detector.on_reply(&mut probe, &mut conn)?;
    assert_eq!(3, conn.sent.len());
    clock.set(Millis(60_000));
    assert_eq!(
        Some(Phase::Probing),
        probe.state().map(|s| s.phase())
    );
    assert_eq!(
        Action::Rejected(RejectReason::AlreadyActive),
        detector.start_episode(&mut probe, &mut conn, true)?
    );
    assert_eq!(3, conn.sent.len());
    Ok(())
}

#[test]
fn test_short_test_duration() -> anyhow::Result<()> {
    let clock = ManualClock::default();
    let detector = Builder::new()
        .test_duration(Duration::from_millis(5))
        .build_with_clock(clock.clone())?;
    let mut conn = Connection::default();
    let mut probe = SessionProbe::new();
    detector.start_episode(&mut probe, &mut conn, true)?;
    clock.set(Millis(10));
    assert_eq!(Action::ProbeSent, detector.on_reply(&mut probe, &mut conn)?);
    clock.set(Millis(20));
    assert!(matches!(
        detector.on_reply(&mut probe, &mut conn)?,
        Action::Finalized(_)
    ));
    let state = probe.state().expect("state");
    assert_eq!(2, state.probes_sent());
    assert_eq!(0, state.cumulative_latency_units());
    Ok(())
}
