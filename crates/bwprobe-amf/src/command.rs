use crate::buffer::Reader;
use crate::error::{Error, Result};
use crate::value::Value;
use std::fmt::{Display, Formatter};

/// An AMF0 command invocation.
///
/// On the wire a command is a sequence of AMF0 values: the command name
/// (a string), the transaction id (a number) and then zero or more
/// positional arguments, the first of which is conventionally the command
/// object (often `null`).
///
/// A peer may send a bare command name with no transaction id or
/// arguments, in which case `transaction_id` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub transaction_id: Option<f64>,
    pub args: Vec<Value>,
}

impl Command {
    #[must_use]
    pub fn new(name: impl Into<String>, transaction_id: f64, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            transaction_id: Some(transaction_id),
            args,
        }
    }

    /// Encode the command.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        Value::string(&self.name).encode(&mut buf)?;
        if let Some(transaction_id) = self.transaction_id {
            Value::Number(transaction_id).encode(&mut buf)?;
        }
        for arg in &self.args {
            arg.encode(&mut buf)?;
        }
        Ok(buf)
    }

    /// The number of bytes this command occupies when encoded.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        3 + self.name.len()
            + self.transaction_id.map_or(0, |_| 9)
            + self.args.iter().map(Value::encoded_len).sum::<usize>()
    }

    /// Decode a command.
    ///
    /// All bytes of `buf` are consumed, any value which cannot be decoded is an
    /// error.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(buf);
        let name = match Value::decode(&mut reader) {
            Ok(Value::String(name)) => String::from_utf8(name).map_err(|_| Error::MissingName)?,
            Ok(_) | Err(Error::InsufficientBuffer(..)) => return Err(Error::MissingName),
            Err(err) => return Err(err),
        };
        let transaction_id = if reader.is_empty() {
            None
        } else {
            let offset = reader.offset();
            match Value::decode(&mut reader)? {
                Value::Number(n) => Some(n),
                other => {
                    return Err(Error::UnexpectedType("number", other.type_name(), offset));
                }
            }
        };
        let mut args = vec![];
        while !reader.is_empty() {
            args.push(Value::decode(&mut reader)?);
        }
        Ok(Self {
            name,
            transaction_id,
            args,
        })
    }

    /// The positional argument at `index`, if present.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// The number argument at `index`.
    pub fn number_at(&self, index: usize) -> Result<f64> {
        match self.arg(index) {
            Some(Value::Number(n)) => Ok(*n),
            Some(other) => Err(Error::UnexpectedType("number", other.type_name(), index)),
            None => Err(Error::UnexpectedType("number", "nothing", index)),
        }
    }

    /// Is the argument at `index` `null` or `undefined`?
    #[must_use]
    pub fn is_null_at(&self, index: usize) -> bool {
        self.arg(index).is_some_and(Value::is_null)
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use itertools::Itertools as _;
        match self.transaction_id {
            Some(transaction_id) => write!(
                f,
                "{}[{}]({})",
                self.name,
                transaction_id,
                self.args.iter().format(", ")
            ),
            None => write!(f, "{}", self.name),
        }
    }
}
