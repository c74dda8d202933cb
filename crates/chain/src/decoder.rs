//! C1: binary decoder for the items captured out of a witness script.
//!
//! The envelope parser (§4.2) hands this module raw byte blobs pulled from
//! witness pushes; this module is the only place that knows how those blobs
//! are laid out (fixed-width headers, length-prefixed fields, bounded
//! GZIP-compressed payloads).

use opnet_crypto::{decompress_bounded, DecompressError};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short: need {need} bytes, have {have}")]
    BufferTooShort { need: usize, have: usize },
    #[error("length prefix {declared} exceeds remaining buffer of {remaining} bytes")]
    LengthPrefixOverrun { declared: usize, remaining: usize },
    #[error("decompressed payload exceeds bound: {0}")]
    DecompressionBoundExceeded(usize),
    #[error("malformed compressed stream: {0}")]
    MalformedStream(String),
}

impl From<DecompressError> for DecodeError {
    fn from(value: DecompressError) -> Self {
        match value {
            DecompressError::OutputTooLarge(limit) => Self::DecompressionBoundExceeded(limit),
            DecompressError::InvalidStream(reason) => Self::MalformedStream(reason),
        }
    }
}

/// A cursor over a byte slice that only ever advances, used to pull
/// fixed-width and length-prefixed fields off witness pushes in order.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::BufferTooShort {
                need: len,
                have: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn take_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn take_u16_le(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn take_u32_le(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a u32-LE length prefix followed by that many bytes.
    pub fn take_length_prefixed(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.take_u32_le()? as usize;
        if len > self.remaining() {
            return Err(DecodeError::LengthPrefixOverrun {
                declared: len,
                remaining: self.remaining(),
            });
        }
        self.take(len)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

/// Decompresses `raw` (a calldata or bytecode payload) bounded by
/// `max_decompressed_size`, passing uncompressed input through untouched
/// (§4 data model: GZIP compression is opportunistic, never mandatory).
pub fn decode_payload(raw: &[u8], max_decompressed_size: usize) -> Result<Vec<u8>, DecodeError> {
    decompress_bounded(raw, max_decompressed_size).map_err(DecodeError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_reads_fixed_and_prefixed_fields() {
        let mut buf = vec![0x01];
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(&buf);

        assert_eq!(cursor.take_u8().unwrap(), 0x01);
        assert_eq!(cursor.take_length_prefixed().unwrap(), b"abc");
        assert!(cursor.is_empty());
    }

    #[test]
    fn cursor_rejects_short_buffer() {
        let buf = [0u8; 1];
        let mut cursor = Cursor::new(&buf);
        assert_eq!(
            cursor.take(2).unwrap_err(),
            DecodeError::BufferTooShort { need: 2, have: 1 }
        );
    }

    #[test]
    fn cursor_rejects_overrunning_length_prefix() {
        let mut buf = 10u32.to_le_bytes().to_vec();
        buf.extend_from_slice(b"ab");
        let mut cursor = Cursor::new(&buf);
        assert!(matches!(
            cursor.take_length_prefixed(),
            Err(DecodeError::LengthPrefixOverrun { .. })
        ));
    }

    #[test]
    fn decode_payload_passes_through_uncompressed() {
        let raw = b"plain calldata".to_vec();
        assert_eq!(decode_payload(&raw, 1024).unwrap(), raw);
    }
}
