//! Directory syncing and the advisory log lock.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{StoreError, StoreResult};

/// Fsyncs a directory so a rename inside it survives a crash.
///
/// Relies on `File::open` accepting a directory, which is POSIX-only; this
/// crate already requires unix for positional reads.
pub(crate) fn sync_directory(path: &Path) -> StoreResult<()> {
    File::open(path)?.sync_all()?;
    Ok(())
}

fn lock_path_for(log_path: &Path) -> PathBuf {
    let mut raw = log_path.as_os_str().to_os_string();
    raw.push(".lock");
    PathBuf::from(raw)
}

/// Advisory exclusive lock on a `<path>.lock` sidecar.
///
/// Held for the lifetime of a store instance so two processes cannot append
/// to the same log. The sidecar carries no data.
pub struct LogLockGuard {
    file: File,
}

impl LogLockGuard {
    pub(crate) fn acquire(log_path: &Path) -> StoreResult<Self> {
        let lock_path = lock_path_for(log_path);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&lock_path)?;

        if FileExt::try_lock_exclusive(&file).is_err() {
            return Err(StoreError::LogLocked {
                path: log_path.to_path_buf(),
            });
        }

        Ok(Self { file })
    }
}

impl Drop for LogLockGuard {
    fn drop(&mut self) {
        // The OS releases the lock when the descriptor closes anyway; an
        // explicit unlock failure leaves nothing to do here.
        let _ = FileExt::unlock(&self.file);
    }
}
