use crate::error::{Error, Result};

/// A read cursor over an immutable byte slice.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// The current byte offset from the start of the buffer.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.offset).copied()
    }

    /// Consume `len` bytes.
    pub fn take(&mut self, what: &'static str, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::InsufficientBuffer(what, len, self.remaining()));
        }
        let bytes = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    /// Consume exactly `N` bytes.
    pub fn take_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        let bytes = self.take(what, N)?;
        Ok(core::array::from_fn(|i| bytes[i]))
    }

    pub fn read_u8(&mut self, what: &'static str) -> Result<u8> {
        Ok(self.take_array::<1>(what)?[0])
    }

    pub fn read_u16(&mut self, what: &'static str) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array(what)?))
    }

    pub fn read_u32(&mut self, what: &'static str) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array(what)?))
    }

    pub fn read_f64(&mut self, what: &'static str) -> Result<f64> {
        Ok(f64::from_be_bytes(self.take_array(what)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader() {
        let buf = [0x01, 0x00, 0x02, 0xff];
        let mut reader = Reader::new(&buf);
        assert_eq!(4, reader.remaining());
        assert_eq!(Some(0x01), reader.peek());
        assert_eq!(Ok(0x01), reader.read_u8("byte"));
        assert_eq!(Ok(2), reader.read_u16("u16"));
        assert_eq!(3, reader.offset());
        assert_eq!(
            Err(Error::InsufficientBuffer("u32", 4, 1)),
            reader.read_u32("u32")
        );
        assert_eq!(Ok(&[0xff][..]), reader.take("tail", 1));
        assert!(reader.is_empty());
        assert_eq!(None, reader.peek());
    }

    #[test]
    fn test_reader_insufficient() {
        let buf = [0x40, 0x08];
        let mut reader = Reader::new(&buf);
        assert_eq!(
            Err(Error::InsufficientBuffer("number", 8, 2)),
            reader.read_f64("number")
        );
        assert_eq!(0, reader.offset());
    }
}
