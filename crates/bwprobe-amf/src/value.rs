use crate::buffer::Reader;
use crate::error::{Error, Result};
use std::fmt::{Display, Formatter};

/// The AMF0 type markers supported.
pub mod marker {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;
    pub const STRICT_ARRAY: u8 = 0x0a;
    pub const LONG_STRING: u8 = 0x0c;
}

/// The maximum nesting of objects and arrays accepted when decoding.
pub const MAX_DEPTH: usize = 32;

/// An AMF0 value.
///
/// Strings are held as raw bytes as AMF0 does not require them to be valid
/// UTF-8, which allows arbitrary binary data to be carried in a string.
///
/// Short and long strings decode to the same `String` variant, the encoding
/// is chosen by length.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(Vec<u8>),
    Object(Vec<(String, Value)>),
    Null,
    Undefined,
    EcmaArray(Vec<(String, Value)>),
    StrictArray(Vec<Value>),
}

impl Value {
    /// Create a string value from text.
    #[must_use]
    pub fn string(s: &str) -> Self {
        Self::String(s.as_bytes().to_vec())
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::String(_) => "string",
            Self::Object(_) => "object",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::EcmaArray(_) => "ecma array",
            Self::StrictArray(_) => "strict array",
        }
    }

    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string value, if this is a string holding valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Undefined)
    }

    /// The number of bytes this value occupies when encoded.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Number(_) => 9,
            Self::Boolean(_) => 2,
            Self::String(bytes) if bytes.len() > usize::from(u16::MAX) => 5 + bytes.len(),
            Self::String(bytes) => 3 + bytes.len(),
            Self::Object(props) => 1 + properties_len(props),
            Self::EcmaArray(props) => 5 + properties_len(props),
            Self::StrictArray(items) => 5 + items.iter().map(Self::encoded_len).sum::<usize>(),
            Self::Null | Self::Undefined => 1,
        }
    }

    /// Append the encoded value to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Number(n) => {
                buf.push(marker::NUMBER);
                buf.extend_from_slice(&n.to_be_bytes());
            }
            Self::Boolean(b) => {
                buf.push(marker::BOOLEAN);
                buf.push(u8::from(*b));
            }
            Self::String(bytes) if bytes.len() > usize::from(u16::MAX) => {
                buf.push(marker::LONG_STRING);
                write_count(buf, bytes.len())?;
                buf.extend_from_slice(bytes);
            }
            Self::String(bytes) => {
                buf.push(marker::STRING);
                write_utf8(buf, bytes)?;
            }
            Self::Object(props) => {
                buf.push(marker::OBJECT);
                write_properties(buf, props)?;
            }
            Self::EcmaArray(props) => {
                buf.push(marker::ECMA_ARRAY);
                write_count(buf, props.len())?;
                write_properties(buf, props)?;
            }
            Self::StrictArray(items) => {
                buf.push(marker::STRICT_ARRAY);
                write_count(buf, items.len())?;
                for item in items {
                    item.encode(buf)?;
                }
            }
            Self::Null => buf.push(marker::NULL),
            Self::Undefined => buf.push(marker::UNDEFINED),
        }
        Ok(())
    }

    /// Decode the next value from the reader.
    ///
    /// Objects and arrays nested more than [`MAX_DEPTH`] deep are rejected.
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Self::decode_nested(reader, 0)
    }

    fn decode_nested(reader: &mut Reader<'_>, depth: usize) -> Result<Self> {
        let offset = reader.offset();
        match reader.read_u8("type marker")? {
            marker::NUMBER => Ok(Self::Number(reader.read_f64("number")?)),
            marker::BOOLEAN => Ok(Self::Boolean(reader.read_u8("boolean")? != 0)),
            marker::STRING => Ok(Self::String(read_utf8(reader)?.to_vec())),
            marker::LONG_STRING => {
                let len = reader.read_u32("long string length")?;
                Ok(Self::String(reader.take("long string", len as usize)?.to_vec()))
            }
            marker::OBJECT => {
                let depth = nested(depth, offset)?;
                Ok(Self::Object(read_properties(reader, depth)?))
            }
            marker::ECMA_ARRAY => {
                let depth = nested(depth, offset)?;
                // the count is advisory, the properties are terminated as for an object
                reader.read_u32("ecma array count")?;
                Ok(Self::EcmaArray(read_properties(reader, depth)?))
            }
            marker::STRICT_ARRAY => {
                let depth = nested(depth, offset)?;
                let count = reader.read_u32("strict array count")?;
                let mut items = vec![];
                for _ in 0..count {
                    items.push(Self::decode_nested(reader, depth)?);
                }
                Ok(Self::StrictArray(items))
            }
            marker::NULL => Ok(Self::Null),
            marker::UNDEFINED => Ok(Self::Undefined),
            other => Err(Error::UnsupportedMarker(other, offset)),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::String(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => write!(f, "'{s}'"),
                Err(_) => write!(f, "<{} bytes>", bytes.len()),
            },
            Self::Object(props) => {
                use itertools::Itertools as _;
                write!(
                    f,
                    "{{{}}}",
                    props
                        .iter()
                        .format_with(", ", |(k, v), f| f(&format_args!("{k}: {v}")))
                )
            }
            Self::EcmaArray(props) => {
                use itertools::Itertools as _;
                write!(
                    f,
                    "[{}]",
                    props
                        .iter()
                        .format_with(", ", |(k, v), f| f(&format_args!("{k}: {v}")))
                )
            }
            Self::StrictArray(items) => {
                use itertools::Itertools as _;
                write!(f, "[{}]", items.iter().format(", "))
            }
            Self::Null => write!(f, "null"),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

fn nested(depth: usize, offset: usize) -> Result<usize> {
    if depth >= MAX_DEPTH {
        return Err(Error::NestingTooDeep(offset));
    }
    Ok(depth + 1)
}

fn properties_len(props: &[(String, Value)]) -> usize {
    props
        .iter()
        .map(|(key, value)| 2 + key.len() + value.encoded_len())
        .sum::<usize>()
        + 3
}

fn write_properties(buf: &mut Vec<u8>, props: &[(String, Value)]) -> Result<()> {
    for (key, value) in props {
        write_utf8(buf, key.as_bytes())?;
        value.encode(buf)?;
    }
    buf.extend_from_slice(&[0x00, 0x00, marker::OBJECT_END]);
    Ok(())
}

fn read_properties(reader: &mut Reader<'_>, depth: usize) -> Result<Vec<(String, Value)>> {
    let mut props = vec![];
    loop {
        let key = read_utf8(reader)?;
        if key.is_empty() && reader.peek() == Some(marker::OBJECT_END) {
            reader.read_u8("object end")?;
            return Ok(props);
        }
        let key = String::from_utf8_lossy(key).into_owned();
        props.push((key, Value::decode_nested(reader, depth)?));
    }
}

fn write_count(buf: &mut Vec<u8>, len: usize) -> Result<()> {
    let count = u32::try_from(len).map_err(|_| Error::LengthOverflow(len))?;
    buf.extend_from_slice(&count.to_be_bytes());
    Ok(())
}

fn write_utf8(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = u16::try_from(bytes.len()).map_err(|_| Error::StringTooLong(bytes.len()))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

fn read_utf8<'a>(reader: &mut Reader<'a>) -> Result<&'a [u8]> {
    let len = reader.read_u16("string length")?;
    reader.take("string", usize::from(len))
}
