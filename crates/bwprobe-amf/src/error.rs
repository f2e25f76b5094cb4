use thiserror::Error;

/// An AMF error result.
pub type Result<T> = std::result::Result<T, Error>;

/// An AMF error.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error {
    /// The buffer ended before a complete value could be read.
    #[error("insufficient buffer for {0}, needed={1}, remaining={2}")]
    InsufficientBuffer(&'static str, usize, usize),
    /// A type marker which is not supported was found.
    #[error("unsupported type marker 0x{0:02x} at offset {1}")]
    UnsupportedMarker(u8, usize),
    /// A value of a different type was found where a specific type was required.
    #[error("expected {0} but found {1} at position {2}")]
    UnexpectedType(&'static str, &'static str, usize),
    /// A string is longer than can be held in a short AMF string.
    #[error("string of length {0} exceeds maximum of {max}", max = u16::MAX)]
    StringTooLong(usize),
    /// A long string or array is longer than can be counted in 32 bits.
    #[error("length {0} exceeds maximum of {max}", max = u32::MAX)]
    LengthOverflow(usize),
    /// Objects or arrays were nested too deeply.
    #[error("nesting exceeds maximum depth of {max} at offset {0}", max = crate::value::MAX_DEPTH)]
    NestingTooDeep(usize),
    /// A command did not start with a string name.
    #[error("missing command name")]
    MissingName,
}
