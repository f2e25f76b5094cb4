//! AMF0 command invocation encoding and decoding.
//!
//! The following AMF0 value types are supported:
//! - `Number`
//! - `Boolean`
//! - `String` and long `String` (contents need not be UTF-8)
//! - `Object`
//! - `Null`
//! - `Undefined`
//! - `ECMA array`
//! - `Strict array`
//!
//! Objects and arrays nested more than [`value::MAX_DEPTH`] deep are rejected
//! when decoding.
//!
//! # Example
//!
//! The following example decodes a `_result` command and reads its
//! positional arguments:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use bwprobe_amf::command::Command;
//!
//! let buf = hex_literal::hex!(
//!     "02 00 07 5f 72 65 73 75 6c 74 00 40 08 00 00 00 00 00 00 05 00 40 00 00 00 00 00 00 00"
//! );
//! let cmd = Command::decode(&buf)?;
//! assert_eq!("_result", cmd.name);
//! assert_eq!(Some(3.0), cmd.transaction_id);
//! assert!(cmd.is_null_at(0));
//! assert_eq!(2.0, cmd.number_at(1)?);
//! # Ok(())
//! # }
//! ```
//!
//! The following example builds an `onBWDone` command:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use bwprobe_amf::command::Command;
//! use bwprobe_amf::value::Value;
//!
//! let cmd = Command::new(
//!     "onBWDone",
//!     4.0,
//!     vec![Value::Null, Value::Number(7804.88), Value::Number(16000.0)],
//! );
//! let buf = cmd.encode()?;
//! assert_eq!(buf.len(), cmd.encoded_len());
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod buffer;

/// AMF errors.
pub mod error;

/// AMF0 values.
pub mod value;

/// AMF0 command invocations.
pub mod command;

pub use buffer::Reader;
