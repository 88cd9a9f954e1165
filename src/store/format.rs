//! On-disk record framing.
//!
//! Each record is framed as:
//!
//! ```text
//! payload_len:u32 | op:u8 | key_len:u32 | val_len:u32 | key | value | payload_len:u32
//! ```
//!
//! All multi-byte fields are little-endian. The suffix length repeats the
//! prefix so a scan can detect a torn tail without checksums;
//! `payload_len == 1 + 4 + 4 + key_len + val_len`.

use std::convert::TryInto;

use crate::error::{StoreError, StoreResult};

pub(crate) const OP_PUT: u8 = 1;
pub(crate) const OP_DEL: u8 = 2;

/// Width of the prefix and suffix `payload_len` fields.
pub(crate) const LEN_FIELD_SIZE: usize = 4;
/// op + key_len + val_len.
pub(crate) const RECORD_HEADER_SIZE: usize = 1 + 4 + 4;
/// Smallest legal record: empty key, empty value.
pub(crate) const MIN_RECORD_SIZE: u64 =
    (LEN_FIELD_SIZE + RECORD_HEADER_SIZE + LEN_FIELD_SIZE) as u64;

#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordHeader {
    pub op: u8,
    pub key_len: u32,
    pub val_len: u32,
}

impl RecordHeader {
    pub(crate) fn from_bytes(bytes: &[u8; RECORD_HEADER_SIZE]) -> Self {
        Self {
            op: bytes[0],
            key_len: u32::from_le_bytes(bytes[1..5].try_into().unwrap()),
            val_len: u32::from_le_bytes(bytes[5..9].try_into().unwrap()),
        }
    }

    pub(crate) fn payload_len(&self) -> u64 {
        RECORD_HEADER_SIZE as u64 + u64::from(self.key_len) + u64::from(self.val_len)
    }

    /// Checks the header against the prefix length field.
    ///
    /// Returns the reason a scan must stop; the caller decides whether that
    /// means a torn tail or mid-file corruption.
    pub(crate) fn validate(&self, claimed_payload: u32) -> Result<(), &'static str> {
        if self.op != OP_PUT && self.op != OP_DEL {
            return Err("unknown record op");
        }
        if self.op == OP_DEL && self.val_len != 0 {
            return Err("DEL record carries a value");
        }
        if self.payload_len() != u64::from(claimed_payload) {
            return Err("header lengths disagree with payload length");
        }
        Ok(())
    }
}

/// Total on-disk size of a record with the given key/value widths.
pub(crate) fn record_size(key_len: usize, val_len: usize) -> u64 {
    MIN_RECORD_SIZE + key_len as u64 + val_len as u64
}

/// Offset of the first value byte relative to the record start.
pub(crate) fn value_offset_in_record(key_len: usize) -> u64 {
    (LEN_FIELD_SIZE + RECORD_HEADER_SIZE) as u64 + key_len as u64
}

fn field_len(field: &'static str, len: usize) -> StoreResult<u32> {
    u32::try_from(len).map_err(|_| StoreError::FieldTooLarge { field, actual: len })
}

fn encode_record(buf: &mut Vec<u8>, op: u8, key: &[u8], value: &[u8]) -> StoreResult<()> {
    let key_len = field_len("key", key.len())?;
    let val_len = field_len("value", value.len())?;
    let payload = RECORD_HEADER_SIZE as u64 + u64::from(key_len) + u64::from(val_len);
    let payload = u32::try_from(payload).map_err(|_| StoreError::FieldTooLarge {
        field: "record payload",
        actual: key.len() + value.len(),
    })?;

    buf.reserve(record_size(key.len(), value.len()) as usize);
    buf.extend_from_slice(&payload.to_le_bytes());
    buf.push(op);
    buf.extend_from_slice(&key_len.to_le_bytes());
    buf.extend_from_slice(&val_len.to_le_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
    buf.extend_from_slice(&payload.to_le_bytes());
    Ok(())
}

/// Appends a framed PUT record to `buf`.
pub(crate) fn encode_put(buf: &mut Vec<u8>, key: &[u8], value: &[u8]) -> StoreResult<()> {
    encode_record(buf, OP_PUT, key, value)
}

/// Appends a framed DEL record to `buf`.
pub(crate) fn encode_delete(buf: &mut Vec<u8>, key: &[u8]) -> StoreResult<()> {
    encode_record(buf, OP_DEL, key, &[])
}
