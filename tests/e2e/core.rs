use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shardlog::codec::{GuidKeyCodec, JsonValueCodec};
use shardlog::{FileStore, StoreOptions, StoreResult};
use uuid::Uuid;

use super::support::{init_tracing, open_store, record_len, s, temp_store_dir};

#[test]
fn basic_lifecycle_survives_reopen() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("core");
    let path = tmp.path().join("store.log");

    {
        let store = open_store(&path, false);
        store.put(s("alpha"), &s("one"))?;
        store.put(s("beta"), &s("two"))?;
        store.put(s("alpha"), &s("ONE"))?;
        assert!(store.delete(&s("beta"))?);
        store.flush()?;
        store.close()?;
    }

    let store = open_store(&path, false);
    assert_eq!(store.get(&s("alpha"))?, Some(s("ONE")));
    assert_eq!(store.get(&s("beta"))?, None);

    let stats = store.stats();
    assert_eq!(stats.live_keys, 1);
    // The log still holds all four records: three PUTs and one DEL.
    let expected = record_len(5, 3) + record_len(4, 3) + record_len(5, 3) + record_len(4, 0);
    assert_eq!(stats.file_bytes, expected);
    Ok(())
}

#[test]
fn repeated_put_is_observationally_idempotent() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("core");
    let store = open_store(&tmp.path().join("store.log"), false);

    store.put(s("k"), &s("v"))?;
    store.put(s("k"), &s("v"))?;

    assert_eq!(store.get(&s("k"))?, Some(s("v")));
    let stats = store.stats();
    assert_eq!(stats.live_keys, 1);
    // Two records on disk, one live key.
    assert_eq!(stats.file_bytes, 2 * record_len(1, 1));
    Ok(())
}

#[test]
fn put_batch_equals_individual_puts() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("core");

    let entries: Vec<(String, String)> = (0..200)
        .map(|i| (format!("key{i:03}"), format!("value-{i}")))
        .collect();

    let batched = open_store(&tmp.path().join("batched.log"), false);
    batched.put_batch(entries.clone(), true)?;

    let individual = open_store(&tmp.path().join("individual.log"), false);
    for (key, value) in &entries {
        individual.put(key.clone(), value)?;
    }
    individual.flush()?;

    assert_eq!(batched.snapshot()?, individual.snapshot()?);
    assert_eq!(batched.stats().file_bytes, individual.stats().file_bytes);
    Ok(())
}

#[test]
fn compaction_survives_reopen() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("core");
    let path = tmp.path().join("store.log");

    {
        let store = open_store(&path, false);
        for letter in b'a'..=b'z' {
            store.put((letter as char).to_string(), &s("payload"))?;
        }
        for letter in b'a'..b'n' {
            assert!(store.delete(&(letter as char).to_string())?);
        }
        store.compact()?;
        store.close()?;
    }

    let store = open_store(&path, false);
    let stats = store.stats();
    assert_eq!(stats.live_keys, 13);
    assert_eq!(stats.tombstones, 0);
    assert_eq!(stats.file_bytes, 13 * record_len(1, 7));
    for letter in b'n'..=b'z' {
        assert_eq!(store.get(&(letter as char).to_string())?, Some(s("payload")));
    }
    Ok(())
}

#[test]
fn scan_live_and_snapshot_agree_after_quiescence() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("core");
    let store = open_store(&tmp.path().join("store.log"), false);

    for i in 0..100 {
        store.put(format!("k{i}"), &format!("v{i}"))?;
    }
    store.delete_batch((0..100).filter(|i| i % 3 == 0).map(|i| format!("k{i}")), false)?;

    let snapshot = store.snapshot()?;
    let mut scanned: Vec<(String, String)> = store.scan_live().collect::<StoreResult<_>>()?;
    scanned.sort();

    assert_eq!(scanned.len(), snapshot.len());
    for (key, value) in scanned {
        assert_eq!(snapshot.get(&key), Some(&value));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    logins: u32,
    active: bool,
}

#[test]
fn guid_keys_with_json_values_round_trip_through_reopen() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("core");
    let path = tmp.path().join("sessions.log");

    let key = Uuid::new_v4();
    let session = Session {
        user: s("ada"),
        logins: 17,
        active: true,
    };

    {
        let store = FileStore::open_with(
            &path,
            Arc::new(GuidKeyCodec),
            Arc::new(JsonValueCodec::<Session>::new()),
            StoreOptions::new(true),
        )?;
        store.put(key, &session)?;
    }

    let store = FileStore::open_with(
        &path,
        Arc::new(GuidKeyCodec),
        Arc::new(JsonValueCodec::<Session>::new()),
        StoreOptions::default(),
    )?;
    assert_eq!(store.get(&key)?, Some(session));
    assert_eq!(store.get(&Uuid::new_v4())?, None);
    Ok(())
}
