//! In-memory byte stream used by the header codec and the pipeline.
//!
//! Reads are sequential and little-endian; running off the end is a
//! `FileCorrupt` error rather than a panic.  Writes append.

use crate::errors::{KdbxError, Result};

#[derive(Debug, Default)]
pub struct BinaryStream {
    data: Vec<u8>,
    pos: usize,
}

impl BinaryStream {
    /// Empty stream for writing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream positioned at the start of `data`, for reading.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            pos: 0,
        }
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                KdbxError::corrupt(format!(
                    "unexpected end of data: wanted {len} bytes at offset {}",
                    self.pos
                ))
            })?;
        let start = self.pos;
        self.pos = end;
        Ok(&self.data[start..end])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.read_bytes(2)?);
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    /// Everything from the current position to the end.
    pub fn read_bytes_to_end(&mut self) -> &[u8] {
        let start = self.pos;
        self.pos = self.data.len();
        &self.data[start..]
    }

    /// Bytes `start..end` of the underlying buffer, without moving the
    /// read position.
    pub fn read_bytes_no_advance(&self, start: usize, end: usize) -> Result<&[u8]> {
        self.data.get(start..end).ok_or_else(|| {
            KdbxError::corrupt(format!(
                "range {start}..{end} outside stream of {} bytes",
                self.data.len()
            ))
        })
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.pos = self.data.len();
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// All bytes written so far.
    pub fn written_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_integers() {
        let mut out = BinaryStream::new();
        out.write_u8(1);
        out.write_u16(0x0203);
        out.write_u32(0x0405_0607);
        out.write_bytes(&[8, 9]);

        let mut input = BinaryStream::from_bytes(out.written_bytes());
        assert_eq!(input.read_u8().unwrap(), 1);
        assert_eq!(input.read_u16().unwrap(), 0x0203);
        assert_eq!(input.read_u32().unwrap(), 0x0405_0607);
        assert_eq!(input.read_bytes(2).unwrap(), &[8, 9]);
        assert_eq!(input.position(), 9);
        assert!(input.read_bytes_to_end().is_empty());
    }

    #[test]
    fn reading_past_end_is_corrupt() {
        let mut input = BinaryStream::from_bytes(&[1, 2, 3]);
        assert!(matches!(input.read_u32(), Err(KdbxError::FileCorrupt(_))));
        // Failed reads do not move the position.
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn no_advance_read_keeps_position() {
        let mut input = BinaryStream::from_bytes(&[1, 2, 3, 4, 5]);
        input.read_bytes(2).unwrap();
        assert_eq!(input.read_bytes_no_advance(0, 4).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(input.position(), 2);
        assert_eq!(input.read_bytes_to_end(), &[3, 4, 5]);
        assert!(input.read_bytes_no_advance(3, 9).is_err());
    }
}
