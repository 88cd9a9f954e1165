use std::path::PathBuf;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("thread pool build error: {0}")]
    ThreadPoolBuild(#[from] rayon::ThreadPoolBuildError),

    #[error("codec error: {reason}")]
    Codec { reason: String },

    #[error("corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: &'static str },

    #[error("index drift: value at offset {offset} (len {len}) lies outside the log")]
    IndexDrift { offset: u64, len: u32 },

    #[error("{field} of {actual} bytes exceeds the 32-bit record length field")]
    FieldTooLarge { field: &'static str, actual: usize },

    #[error("log at {path:?} is locked by another store instance")]
    LogLocked { path: PathBuf },

    #[error("operation cancelled")]
    Cancelled,

    #[error("unsupported configuration: {reason}")]
    Unsupported { reason: String },
}

impl StoreError {
    /// True for errors that mean the index and the file no longer agree.
    ///
    /// Callers should drop the instance and reopen to force a replay.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::IndexDrift { .. })
    }
}
