use bytes::Bytes;
use std::io::{Cursor, Error, ErrorKind, Read, Result};

/// Big endian reader over an in-memory buffer.
///
/// Cloning the reader (or taking sub slices with [`Reader::read_bytes`])
/// never copies the underlying data.
#[derive(Clone, Default)]
pub struct Reader {
    inner: Cursor<Bytes>,
}

impl Reader {
    pub fn new(data: Bytes) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }

    pub fn has_more_data(&self) -> bool {
        self.inner.position() < self.get_length()
    }

    pub fn get_length(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    pub fn get_position(&self) -> u64 {
        self.inner.position()
    }

    pub fn remaining(&self) -> u64 {
        self.get_length().saturating_sub(self.get_position())
    }

    pub fn skip(&mut self, bytes: u64) -> Result<()> {
        let position = self.get_position() + bytes;

        if position > self.get_length() {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                "Reader skips out of memory bounds.",
            ));
        }

        self.inner.set_position(position);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0; 8];
        self.inner.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Read an unsigned integer stored in `width` bytes (1 to 8).
    pub fn read_uint(&mut self, width: u8) -> Result<u64> {
        if !(1..=8).contains(&width) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("cannot read {width} byte wide integer"),
            ));
        }

        let mut buf = [0; 8];
        self.inner.read_exact(&mut buf[8 - width as usize..])?;
        Ok(u64::from_be_bytes(buf))
    }

    pub fn read_bytes_u8(&mut self, bytes: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; bytes];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read `bytes` bytes as a shared slice of the underlying buffer.
    pub fn read_bytes(&mut self, bytes: usize) -> Result<Bytes> {
        if bytes as u64 > self.remaining() {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                "Reader reads out of memory bounds.",
            ));
        }

        let start = self.get_position() as usize;
        self.inner.set_position((start + bytes) as u64);
        Ok(self.inner.get_ref().slice(start..start + bytes))
    }
}
