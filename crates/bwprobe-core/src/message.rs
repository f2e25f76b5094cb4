use crate::constants::{inbound, outbound, CHECK_TRANSACTION, DONE_TRANSACTION};
use crate::error::{Error, Result};
use crate::payload::ProbePayload;
use crate::strategy::Estimate;
use crate::types::Transaction;
use bwprobe_amf::command::Command;
use bwprobe_amf::value::Value;

/// An inbound command addressed to bandwidth probing.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A request to start an episode.
    ///
    /// Both `checkBandwidth` and `onClientBWCheck` map to this.
    Start { has_body: bool },
    /// A `_result` reply.
    ///
    /// The `count` is the peer's reply sequence, it is present for probe
    /// acknowledgements and is used for diagnostics only.
    Result {
        transaction: Transaction,
        count: Option<f64>,
    },
    /// An `_error` reply.
    Error { transaction: Transaction },
    /// A command which is not addressed to bandwidth probing.
    Other(String),
}

impl TryFrom<&Command> for Inbound {
    type Error = Error;

    fn try_from(cmd: &Command) -> Result<Self> {
        match cmd.name.as_str() {
            inbound::CHECK_BANDWIDTH | inbound::ON_CLIENT_BW_CHECK => Ok(Self::Start {
                has_body: cmd.transaction_id.is_some() || !cmd.args.is_empty(),
            }),
            inbound::RESULT => {
                let transaction = transaction(cmd, inbound::RESULT)?;
                let count = match transaction {
                    Transaction::Check => Some(
                        cmd.number_at(1)
                            .map_err(|err| Error::Malformed(inbound::RESULT, err.to_string()))?,
                    ),
                    _ => cmd.arg(1).and_then(Value::as_number),
                };
                Ok(Self::Result { transaction, count })
            }
            inbound::ERROR => Ok(Self::Error {
                transaction: transaction(cmd, inbound::ERROR)?,
            }),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}

fn transaction(cmd: &Command, name: &'static str) -> Result<Transaction> {
    cmd.transaction_id
        .map(Transaction::from)
        .ok_or_else(|| Error::Malformed(name, String::from("missing transaction id")))
}

/// Build a probe command.
///
/// A probe without a payload carries an empty string body.
#[must_use]
pub fn check_command(payload: Option<&ProbePayload>) -> Command {
    let body = payload.map_or_else(Vec::new, |payload| payload.to_vec());
    Command::new(
        outbound::CHECK,
        CHECK_TRANSACTION as f64,
        vec![Value::Null, Value::String(body)],
    )
}

/// Build the final estimate command.
#[must_use]
pub fn done_command(estimate: &Estimate) -> Command {
    Command::new(
        outbound::DONE,
        DONE_TRANSACTION as f64,
        vec![
            Value::Null,
            Value::Number(estimate.kbps),
            Value::Number(estimate.kilobits),
            Value::Number(estimate.seconds),
            Value::Number(estimate.latency.0 as f64),
        ],
    )
}

/// Encode a command for sending, mapping encode failures to `Error::Encode`.
pub fn encode_command(cmd: &Command) -> Result<Vec<u8>> {
    cmd.encode().map_err(|err| match cmd.name.as_str() {
        outbound::CHECK => Error::Encode(outbound::CHECK, err),
        outbound::DONE => Error::Encode(outbound::DONE, err),
        _ => Error::Encode("command", err),
    })
}
