use std::fs::OpenOptions;
use std::io::Write;

use shardlog::StoreResult;

use super::support::{init_tracing, open_store, record_len, s, temp_store_dir};

#[test]
fn opening_an_empty_file_yields_an_empty_live_set() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("durability");
    let path = tmp.path().join("empty.log");
    std::fs::File::create(&path).unwrap();

    let store = open_store(&path, false);
    let stats = store.stats();
    assert_eq!(stats.live_keys, 0);
    assert_eq!(stats.file_bytes, 0);
    assert_eq!(store.get(&s("anything"))?, None);
    Ok(())
}

#[test]
fn crash_inside_a_record_truncates_to_the_preceding_boundary() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("durability");
    let path = tmp.path().join("crash.log");

    const TOTAL: usize = 2_000;
    const CUT_AT: usize = 1_500;
    // key "k0000" and value "v0000": 5 bytes each, uniform records.
    let record = record_len(5, 5);

    {
        let store = open_store(&path, false);
        store.put_batch(
            (0..TOTAL).map(|i| (format!("k{i:04}"), format!("v{i:04}"))),
            true,
        )?;
        store.close()?;
    }

    // Simulate the crash: cut the file a few bytes into record CUT_AT.
    let boundary = CUT_AT as u64 * record;
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(boundary + 9).unwrap();
    file.sync_all().unwrap();
    drop(file);

    let store = open_store(&path, false);
    let stats = store.stats();
    assert_eq!(stats.live_keys, CUT_AT);
    assert_eq!(stats.file_bytes, boundary);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), boundary);

    for i in 0..CUT_AT {
        assert_eq!(
            store.get(&format!("k{i:04}"))?,
            Some(format!("v{i:04}")),
            "key k{i:04} should have survived"
        );
    }
    for i in CUT_AT..TOTAL {
        assert_eq!(store.get(&format!("k{i:04}"))?, None);
    }
    Ok(())
}

#[test]
fn garbage_after_the_last_record_is_discarded_on_open() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("durability");
    let path = tmp.path().join("garbage.log");

    {
        let store = open_store(&path, false);
        store.put(s("alpha"), &s("one"))?;
        store.flush()?;
        store.close()?;
    }

    let clean_len = record_len(5, 3);
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0xFF; 128]).unwrap();
        file.sync_all().unwrap();
    }
    assert_eq!(std::fs::metadata(&path).unwrap().len(), clean_len + 128);

    let store = open_store(&path, false);
    assert_eq!(store.get(&s("alpha"))?, Some(s("one")));
    assert_eq!(store.stats().live_keys, 1);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), clean_len);
    Ok(())
}

#[test]
fn deletes_and_overwrites_replay_in_file_order() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("durability");
    let path = tmp.path().join("order.log");

    {
        let store = open_store(&path, true);
        store.put(s("k"), &s("first"))?;
        store.delete(&s("k"))?;
        store.put(s("k"), &s("second"))?;
        store.put(s("gone"), &s("x"))?;
        store.delete(&s("gone"))?;
        store.close()?;
    }

    let store = open_store(&path, false);
    assert_eq!(store.get(&s("k"))?, Some(s("second")));
    assert_eq!(store.get(&s("gone"))?, None);
    let stats = store.stats();
    assert_eq!(stats.live_keys, 1);
    assert_eq!(stats.tombstones, 1);
    Ok(())
}

#[test]
fn unflushed_writes_are_still_visible_in_process() -> StoreResult<()> {
    init_tracing();
    let tmp = temp_store_dir("durability");
    let store = open_store(&tmp.path().join("visible.log"), false);

    store.put(s("k"), &s("v"))?;
    // No flush: the write may not be durable yet, but it must be visible.
    assert_eq!(store.get(&s("k"))?, Some(s("v")));
    Ok(())
}
