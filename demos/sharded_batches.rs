//! Sharded store with concurrent batch dispatch
//!
//! Run with: cargo run --example sharded_batches

use std::sync::Arc;
use std::time::Instant;

use shardlog::codec::{Utf8KeyCodec, Utf8ValueCodec};
use shardlog::{ShardedOptions, ShardedStore};

const ENTRIES: usize = 100_000;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Shardlog Sharded Batches Example\n");

    let options = ShardedOptions::new(8).with_thread_count(4);
    println!("📦 Opening 8 shards at ./data/sharded.shardNN.log, 4 dispatch threads\n");
    let store = ShardedStore::open_with(
        "./data/sharded",
        Arc::new(Utf8KeyCodec),
        Arc::new(Utf8ValueCodec),
        options,
    )?;

    println!("✏️  Batch putting {ENTRIES} entries");
    let start = Instant::now();
    store.put_batch(
        (0..ENTRIES).map(|i| (format!("key{i:06}"), format!("value-{i}"))),
        true,
    )?;
    println!("   ✓ Done in {:?}\n", start.elapsed());

    let key = format!("key{:06}", ENTRIES / 2);
    println!("🔍 Point read: {key} = {:?}", store.get(&key)?);
    println!("   Routed to shard {:02}\n", store.shard_index(&key));

    println!("🗑️  Batch deleting every other key");
    let start = Instant::now();
    let deleted = store.delete_batch(
        (0..ENTRIES).step_by(2).map(|i| format!("key{i:06}")),
        true,
    )?;
    println!("   ✓ Deleted {deleted} in {:?}\n", start.elapsed());

    let before = store.stats();
    println!("🧹 Compacting all shards ({} bytes on disk)", before.file_bytes);
    let start = Instant::now();
    store.compact_all()?;
    let after = store.stats();
    println!(
        "   ✓ {} → {} bytes, {} live keys, in {:?}",
        before.file_bytes,
        after.file_bytes,
        after.live_keys,
        start.elapsed()
    );

    store.close()?;
    println!("\n✅ Done");
    Ok(())
}
