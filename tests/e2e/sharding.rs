use std::sync::Arc;

use shardlog::codec::{KeyCodec, Utf8KeyCodec, Utf8ValueCodec};
use shardlog::{ShardedOptions, ShardedStore, StoreResult};

use super::support::{init_tracing, open_shards, open_store, shard_file, temp_store_dir};

#[test]
fn keys_route_to_the_hashed_shard_file() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("sharding");
    let base = tmp.path().join("data").join("kv");

    let expected_shard = |key: &String| (Utf8KeyCodec.hash64(key) % 4) as usize;

    {
        let store = open_shards(&base, 4);
        for i in 0..1_000 {
            let key = format!("key{i:04}");
            assert_eq!(store.shard_index(&key), expected_shard(&key));
            store.put(key, &format!("{i}"))?;
        }
        store.flush_all()?;
        store.close()?;
    }

    // Each shard file is itself a plain single-file log: open them directly
    // and check every key appears in exactly its hashed shard.
    let shards: Vec<_> = (0..4)
        .map(|index| open_store(&shard_file(&base, index), false))
        .collect();
    for i in 0..1_000 {
        let key = format!("key{i:04}");
        let home = expected_shard(&key);
        for (index, shard) in shards.iter().enumerate() {
            let value = shard.get(&key)?;
            if index == home {
                assert_eq!(value, Some(format!("{i}")), "key {key} missing from shard {index}");
            } else {
                assert_eq!(value, None, "key {key} leaked into shard {index}");
            }
        }
    }
    Ok(())
}

#[test]
fn reopening_with_the_same_shard_count_preserves_the_live_set() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("sharding");
    let base = tmp.path().join("kv");

    let before = {
        let store = open_shards(&base, 4);
        for i in 0..1_000 {
            store.put(format!("key{i:04}"), &format!("{i}"))?;
        }
        store.flush_all()?;
        let snapshot = store.snapshot_all()?;
        store.close()?;
        snapshot
    };

    let store = open_shards(&base, 4);
    assert_eq!(store.snapshot_all()?, before);
    assert_eq!(store.stats().live_keys, 1_000);
    Ok(())
}

#[test]
fn concurrent_batches_and_compaction_across_shards() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("sharding");
    let base = tmp.path().join("kv");

    let options = ShardedOptions::new(8).with_thread_count(4);
    let store: ShardedStore<String, String, _, _> = ShardedStore::open_with(
        &base,
        Arc::new(Utf8KeyCodec),
        Arc::new(Utf8ValueCodec),
        options,
    )?;

    store.put_batch(
        (0..10_000).map(|i| (format!("key{i:05}"), format!("value-{i}"))),
        true,
    )?;
    let deleted = store.delete_batch((0..5_000).map(|i| format!("key{i:05}")), true)?;
    assert_eq!(deleted, 5_000);

    let before = store.snapshot_all()?;
    assert_eq!(before.len(), 5_000);

    store.compact_all()?;

    let after = store.snapshot_all()?;
    assert_eq!(before, after);
    let stats = store.stats();
    assert_eq!(stats.live_keys, 5_000);
    assert_eq!(stats.tombstones, 0);
    Ok(())
}

#[test]
fn per_key_operations_see_batch_writes() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("sharding");
    let store = open_shards(&tmp.path().join("kv"), 4);

    store.put_batch(
        (0..100).map(|i| (format!("k{i}"), format!("v{i}"))),
        false,
    )?;

    assert_eq!(store.get(&"k42".to_string())?, Some("v42".to_string()));
    assert!(store.delete(&"k42".to_string())?);
    assert_eq!(store.get(&"k42".to_string())?, None);
    assert!(!store.delete(&"k42".to_string())?);
    Ok(())
}
