//! Basic usage example demonstrating core operations
//!
//! Run with: cargo run --example basic_usage

use shardlog::codec::{Utf8KeyCodec, Utf8ValueCodec};
use shardlog::FileStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Shardlog Basic Usage Example\n");

    println!("📦 Opening store at ./data/basic_example.log (write-through)\n");
    let store = FileStore::open(
        "./data/basic_example.log",
        Utf8KeyCodec,
        Utf8ValueCodec,
        true, // fsync every mutation
    )?;

    // Example 1: PUT a new key-value pair
    println!("✏️  Putting \"alpha\" = \"one\"");
    store.put("alpha".to_string(), &"one".to_string())?;
    match store.get(&"alpha".to_string())? {
        Some(value) => println!("   ✓ Value confirmed: {value}\n"),
        None => println!("   ✗ Key not found\n"),
    }

    // Example 2: Overwrite the same key
    println!("✏️  Putting \"alpha\" = \"ONE\"");
    store.put("alpha".to_string(), &"ONE".to_string())?;
    match store.get(&"alpha".to_string())? {
        Some(value) => println!("   ✓ Updated value: {value}\n"),
        None => println!("   ✗ Key not found\n"),
    }

    // Example 3: Batch load
    println!("✏️  Batch putting 3 keys");
    store.put_batch(
        vec![
            ("beta".to_string(), "two".to_string()),
            ("gamma".to_string(), "three".to_string()),
            ("delta".to_string(), "four".to_string()),
        ],
        true,
    )?;
    println!("   ✓ Put 3 keys\n");

    // Example 4: Delete and inspect the live set
    println!("🗑️  Deleting \"beta\"");
    let deleted = store.delete(&"beta".to_string())?;
    println!("   ✓ Deleted: {deleted}\n");

    println!("🔍 Live set:");
    for pair in store.scan_live() {
        let (key, value) = pair?;
        println!("   {key} = {value}");
    }

    // Example 5: Compact away the overwrite and the tombstone
    let before = store.stats();
    store.compact()?;
    let after = store.stats();
    println!(
        "\n🧹 Compacted: {} → {} bytes ({} live keys)",
        before.file_bytes, after.file_bytes, after.live_keys
    );

    store.close()?;
    println!("\n✅ Done");
    Ok(())
}
