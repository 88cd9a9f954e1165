//! Log replay and tail repair.
//!
//! On open (and after compaction) the log is scanned from offset 0 and every
//! well-formed record is fed to the caller. A torn or unrecognisable tail is
//! truncated to the last good record boundary; a damaged record fully inside
//! the file fails the scan instead, because bytes after it may be
//! unreachable valid data.

use std::fs::OpenOptions;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{StoreError, StoreResult};

use super::format::{
    RecordHeader, LEN_FIELD_SIZE, MIN_RECORD_SIZE, RECORD_HEADER_SIZE,
};

/// One record observed during replay. The key borrows the scan buffer.
pub(crate) struct ReplayedRecord<'a> {
    pub op: u8,
    pub key_bytes: &'a [u8],
    pub value_offset: u64,
    pub value_len: u32,
}

/// Scans `path` from offset 0, invoking `on_record` for each valid record.
///
/// Returns the durable end of the log after any tail repair. The file is
/// truncated (and synced) when a torn tail is found.
pub(crate) fn replay_log(
    path: &Path,
    mut on_record: impl FnMut(ReplayedRecord<'_>) -> StoreResult<()>,
) -> StoreResult<u64> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let file_len = file.metadata()?.len();

    let mut reader = BufReader::new(&file);
    let mut offset = 0u64;
    let mut last_good_end = 0u64;
    let mut torn_tail = false;
    let mut key_buf = Vec::new();

    while offset < file_len {
        if file_len - offset < MIN_RECORD_SIZE {
            tracing::warn!(
                offset,
                file_len,
                "trailing bytes shorter than a minimal record; repairing tail"
            );
            torn_tail = true;
            break;
        }

        let mut len_bytes = [0u8; LEN_FIELD_SIZE];
        reader.read_exact(&mut len_bytes)?;
        let payload_len = u32::from_le_bytes(len_bytes);

        let claimed_end = offset
            + (2 * LEN_FIELD_SIZE) as u64
            + u64::from(payload_len);
        if u64::from(payload_len) < RECORD_HEADER_SIZE as u64 || claimed_end > file_len {
            tracing::warn!(
                offset,
                payload_len,
                file_len,
                "record extent is impossible; repairing tail"
            );
            torn_tail = true;
            break;
        }

        let mut header_bytes = [0u8; RECORD_HEADER_SIZE];
        reader.read_exact(&mut header_bytes)?;
        let header = RecordHeader::from_bytes(&header_bytes);
        if let Err(reason) = header.validate(payload_len) {
            tracing::warn!(offset, reason, "malformed record header; repairing tail");
            torn_tail = true;
            break;
        }

        key_buf.resize(header.key_len as usize, 0);
        reader.read_exact(&mut key_buf)?;
        reader.seek_relative(i64::from(header.val_len))?;

        let mut suffix_bytes = [0u8; LEN_FIELD_SIZE];
        reader.read_exact(&mut suffix_bytes)?;
        if suffix_bytes != len_bytes {
            // The record extent fits the file and the header is coherent, so
            // this is damaged data, not a torn append.
            return Err(StoreError::CorruptRecord {
                offset,
                reason: "suffix length disagrees with prefix",
            });
        }

        on_record(ReplayedRecord {
            op: header.op,
            key_bytes: &key_buf,
            value_offset: offset
                + (LEN_FIELD_SIZE + RECORD_HEADER_SIZE) as u64
                + u64::from(header.key_len),
            value_len: header.val_len,
        })?;

        offset = claimed_end;
        last_good_end = offset;
    }

    if torn_tail && last_good_end < file_len {
        file.set_len(last_good_end)?;
        file.sync_all()?;
        tracing::warn!(
            truncated_from = file_len,
            truncated_to = last_good_end,
            ?path,
            "truncated torn log tail to last durable record"
        );
    }

    Ok(last_good_end)
}
