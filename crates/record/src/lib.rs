//! # Record — On-Disk Record Codec
//!
//! Every mutation in DriftKV is persisted as one self-describing,
//! CRC-protected record appended to a segment file. This crate is the pure
//! codec layer: it knows how to turn a `(key, value, timestamp, tombstone)`
//! tuple into bytes and back, and nothing about files or indexes.
//!
//! ## Binary Record Format
//!
//! ```text
//! [version: u8][crc32: u32 LE][timestamp: i64 LE]
//! [key_len: i32 LE][value_len: i64 LE][tombstone: u8][key][value]
//! ```
//!
//! The fixed header is 26 bytes. The CRC32 (IEEE) covers everything **after**
//! the CRC field itself — timestamp through the last value byte — so a
//! flipped bit anywhere in a record's payload is detected on decode.
//!
//! A tombstone is a record with the low bit of the flag byte set and a
//! zero-length value. A zero-length value is indistinguishable from a
//! tombstone on the read path and is treated as one.
//!
//! ## Example
//!
//! ```rust
//! use record::Record;
//!
//! let rec = Record::new(b"hello", b"world", 1_700_000_000).unwrap();
//! let bytes = rec.encode();
//! let back = Record::decode(&mut &bytes[..]).unwrap();
//! assert_eq!(back, rec);
//! ```

use byteorder::{LittleEndian, ReadBytesExt};
use crc32fast::Hasher as Crc32;
use std::io::{self, Read};
use thiserror::Error;

/// The only record format version currently written or accepted.
pub const FORMAT_VERSION: u8 = 0x00;

/// Width of the fixed record header in bytes:
/// version (1) + crc32 (4) + timestamp (8) + key_len (4) + value_len (8) +
/// tombstone flag (1).
pub const HEADER_LEN: usize = 26;

/// Low bit of the flag byte marks a deletion.
const TOMBSTONE_FLAG: u8 = 0x01;

/// Largest key the format can describe (`key_len` is a signed 32-bit field).
pub const MAX_KEY_LEN: usize = i32::MAX as usize;

/// Errors produced while building or decoding records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// An underlying I/O error. `UnexpectedEof` mid-record means the byte
    /// stream ended inside a record, which the scanner treats as a torn
    /// append at the segment tail.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The stored CRC32 disagrees with the decoded bytes, or a length field
    /// is implausible (non-positive key length, negative value length).
    #[error("crc mismatch (data corruption)")]
    Integrity,

    /// The version byte is not [`FORMAT_VERSION`].
    #[error("unsupported record format version {0:#04x}")]
    Version(u8),

    /// Records must carry a non-empty key.
    #[error("key must not be empty")]
    EmptyKey,

    /// The key length does not fit the signed 32-bit `key_len` field.
    #[error("key too large: {0} bytes")]
    KeyTooLarge(usize),
}

/// A single decoded (or to-be-encoded) record.
///
/// Construction goes through [`Record::new`] / [`Record::new_tombstone`],
/// which enforce the key invariants; after that `encode` cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Seconds since the Unix epoch at write time.
    pub timestamp: i64,
    /// The lookup key. Never empty.
    pub key: Vec<u8>,
    /// The payload. Empty for tombstones.
    pub value: Vec<u8>,
    /// Deletion marker.
    pub tombstone: bool,
}

impl Record {
    /// Builds a live record carrying `value` for `key`.
    pub fn new(key: &[u8], value: &[u8], timestamp: i64) -> Result<Self, RecordError> {
        Self::build(key, value, timestamp, false)
    }

    /// Builds a tombstone for `key`. The value is always empty.
    pub fn new_tombstone(key: &[u8], timestamp: i64) -> Result<Self, RecordError> {
        Self::build(key, b"", timestamp, true)
    }

    fn build(
        key: &[u8],
        value: &[u8],
        timestamp: i64,
        tombstone: bool,
    ) -> Result<Self, RecordError> {
        if key.is_empty() {
            return Err(RecordError::EmptyKey);
        }
        if key.len() > MAX_KEY_LEN {
            return Err(RecordError::KeyTooLarge(key.len()));
        }
        Ok(Self {
            timestamp,
            key: key.to_vec(),
            value: value.to_vec(),
            tombstone,
        })
    }

    /// Total on-disk length of this record. The scanner advances by this
    /// amount after each decode.
    pub fn encoded_len(&self) -> u64 {
        (HEADER_LEN + self.key.len() + self.value.len()) as u64
    }

    /// Offset of the first value byte relative to the start of the record:
    /// the fixed header plus the key bytes.
    pub fn value_offset(&self) -> u64 {
        (HEADER_LEN + self.key.len()) as u64
    }

    /// Serializes the record into the on-disk layout.
    pub fn encode(&self) -> Vec<u8> {
        // Body = the CRC-covered region: timestamp through value bytes.
        let body_len = HEADER_LEN - 5 + self.key.len() + self.value.len();
        let mut body = Vec::with_capacity(body_len);
        body.extend_from_slice(&self.timestamp.to_le_bytes());
        body.extend_from_slice(&(self.key.len() as i32).to_le_bytes());
        body.extend_from_slice(&(self.value.len() as i64).to_le_bytes());
        body.push(if self.tombstone { TOMBSTONE_FLAG } else { 0x00 });
        body.extend_from_slice(&self.key);
        body.extend_from_slice(&self.value);

        let mut hasher = Crc32::new();
        hasher.update(&body);
        let crc = hasher.finalize();

        let mut out = Vec::with_capacity(5 + body.len());
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// Decodes one record from `reader`.
    ///
    /// Reads exactly the fixed header, then the key and value regions, and
    /// verifies the CRC over the same bytes the encoder covered.
    ///
    /// # Errors
    ///
    /// - [`RecordError::Version`] if the version byte is unknown.
    /// - [`RecordError::Integrity`] on a CRC mismatch or an implausible
    ///   length field.
    /// - [`RecordError::Io`] on any read failure; `UnexpectedEof` here means
    ///   the stream ended inside the record.
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self, RecordError> {
        let mut head = [0u8; HEADER_LEN];
        reader.read_exact(&mut head)?;

        let mut h = &head[..];
        let version = h.read_u8()?;
        if version != FORMAT_VERSION {
            return Err(RecordError::Version(version));
        }
        let stored_crc = h.read_u32::<LittleEndian>()?;
        let timestamp = h.read_i64::<LittleEndian>()?;
        let key_len = h.read_i32::<LittleEndian>()?;
        let value_len = h.read_i64::<LittleEndian>()?;
        let flags = h.read_u8()?;

        // Reject garbage lengths before reading anything.
        if key_len <= 0 || value_len < 0 {
            return Err(RecordError::Integrity);
        }

        let key = read_exact_vec(reader, key_len as u64)?;
        let value = read_exact_vec(reader, value_len as u64)?;

        let mut hasher = Crc32::new();
        hasher.update(&head[5..]);
        hasher.update(&key);
        hasher.update(&value);
        if hasher.finalize() != stored_crc {
            return Err(RecordError::Integrity);
        }

        Ok(Self {
            timestamp,
            key,
            value,
            tombstone: flags & TOMBSTONE_FLAG == TOMBSTONE_FLAG,
        })
    }
}

/// Reads exactly `len` bytes into a fresh buffer.
///
/// The buffer grows only as bytes actually arrive, so a corrupt length
/// field cannot trigger a huge up-front allocation; it just runs into
/// end-of-stream and reports `UnexpectedEof`.
fn read_exact_vec<R: Read>(reader: &mut R, len: u64) -> Result<Vec<u8>, RecordError> {
    let mut buf = Vec::new();
    let n = reader.by_ref().take(len).read_to_end(&mut buf)?;
    if (n as u64) < len {
        return Err(RecordError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "record truncated",
        )));
    }
    Ok(buf)
}

#[cfg(test)]
mod tests;
