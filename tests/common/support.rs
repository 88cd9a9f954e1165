use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use shardlog::codec::{Utf8KeyCodec, Utf8ValueCodec};
use shardlog::{FileStore, ShardedStore};
use tempfile::{tempdir_in, TempDir};

static INIT_TRACING: Once = Once::new();

pub type StringStore = FileStore<String, String, Utf8KeyCodec, Utf8ValueCodec>;
pub type StringShards = ShardedStore<String, String, Utf8KeyCodec, Utf8ValueCodec>;

pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Creates a unique scratch directory under `target/testdata/<group>` so
/// artefacts of failed runs are easy to find and ignored by git.
pub fn temp_store_dir(group: &str) -> TempDir {
    let workspace_tmp = std::env::current_dir()
        .unwrap()
        .join("target/testdata")
        .join(group);
    fs::create_dir_all(&workspace_tmp).unwrap();
    tempdir_in(&workspace_tmp).unwrap()
}

pub fn open_store(path: &Path, write_through: bool) -> StringStore {
    FileStore::open(path, Utf8KeyCodec, Utf8ValueCodec, write_through).unwrap()
}

pub fn open_shards(base: &Path, shard_count: usize) -> StringShards {
    ShardedStore::open(base, shard_count, Utf8KeyCodec, Utf8ValueCodec, false).unwrap()
}

pub fn s(text: &str) -> String {
    text.to_string()
}

/// On-disk size of one record: two length fields, the 9-byte header, and
/// the key/value payloads.
pub fn record_len(key_len: usize, val_len: usize) -> u64 {
    (4 + 9 + 4 + key_len + val_len) as u64
}

pub fn shard_file(base: &Path, index: usize) -> PathBuf {
    StringShards::shard_path(base, index)
}
