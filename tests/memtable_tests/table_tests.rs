//! MemTable Tests
//!
//! Tests verify:
//! - Basic CRUD operations
//! - Delete idempotence
//! - Sorted entry copies
//! - Wholesale replacement
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;

use retainkv::memtable::MemTable;

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_memtable_is_empty() {
    let memtable = MemTable::new();
    assert_eq!(memtable.len(), 0);
    assert!(memtable.is_empty());
    assert!(memtable.entries().is_empty());
}

#[test]
fn test_put_and_get() {
    let memtable = MemTable::new();

    memtable.put("key1".to_string(), b"value1".to_vec());

    assert_eq!(memtable.get("key1"), Some(b"value1".to_vec()));
}

#[test]
fn test_get_nonexistent_key() {
    let memtable = MemTable::new();
    assert_eq!(memtable.get("nonexistent"), None);
}

#[test]
fn test_put_overwrites_existing() {
    let memtable = MemTable::new();

    memtable.put("key1".to_string(), b"value1".to_vec());
    memtable.put("key1".to_string(), b"value2".to_vec());

    assert_eq!(memtable.len(), 1);
    assert_eq!(memtable.get("key1"), Some(b"value2".to_vec()));
}

#[test]
fn test_put_many_and_get_many() {
    let memtable = MemTable::new();

    memtable.put_many(vec![
        ("a".to_string(), b"1".to_vec()),
        ("b".to_string(), b"2".to_vec()),
        ("a".to_string(), b"3".to_vec()),
    ]);

    assert_eq!(memtable.len(), 2);
    assert_eq!(
        memtable.get_many(["a", "b", "c"]),
        vec![Some(b"3".to_vec()), Some(b"2".to_vec()), None]
    );
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_removes_key() {
    let memtable = MemTable::new();

    memtable.put("key1".to_string(), b"value1".to_vec());
    assert!(memtable.delete("key1"));

    assert_eq!(memtable.get("key1"), None);
    assert!(memtable.is_empty());
}

#[test]
fn test_delete_is_idempotent() {
    let memtable = MemTable::new();

    assert!(!memtable.delete("never-set"));

    memtable.put("key1".to_string(), b"value1".to_vec());
    assert!(memtable.delete("key1"));
    assert!(!memtable.delete("key1"));
    assert_eq!(memtable.get("key1"), None);
}

// =============================================================================
// Snapshot Support Tests
// =============================================================================

#[test]
fn test_entries_are_sorted() {
    let memtable = MemTable::new();

    memtable.put("c".to_string(), b"3".to_vec());
    memtable.put("a".to_string(), b"1".to_vec());
    memtable.put("b".to_string(), b"2".to_vec());

    let keys: Vec<String> = memtable.entries().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn test_replace_discards_old_records() {
    let memtable = MemTable::new();

    memtable.put("old".to_string(), b"x".to_vec());
    memtable.replace(vec![
        ("new1".to_string(), b"1".to_vec()),
        ("new2".to_string(), b"2".to_vec()),
    ]);

    assert_eq!(memtable.get("old"), None);
    assert_eq!(memtable.get("new1"), Some(b"1".to_vec()));
    assert_eq!(memtable.len(), 2);
}

#[test]
fn test_clear() {
    let memtable = MemTable::new();

    memtable.put("a".to_string(), b"1".to_vec());
    memtable.put("b".to_string(), b"2".to_vec());
    memtable.clear();

    assert!(memtable.is_empty());
    assert_eq!(memtable.get("a"), None);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_disjoint_keys() {
    let memtable = Arc::new(MemTable::new());
    let threads = 8;
    let per_thread = 500;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let memtable = Arc::clone(&memtable);
            thread::spawn(move || {
                for i in 0..per_thread {
                    memtable.put(format!("t{}-k{}", t, i), format!("v{}", i).into_bytes());
                }
                // Every other key is deleted again
                for i in (0..per_thread).step_by(2) {
                    memtable.delete(&format!("t{}-k{}", t, i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(memtable.len(), threads * per_thread / 2);
    for t in 0..threads {
        assert_eq!(memtable.get(&format!("t{}-k0", t)), None);
        assert_eq!(memtable.get(&format!("t{}-k1", t)), Some(b"v1".to_vec()));
    }
}

#[test]
fn test_replace_is_never_observed_half_done() {
    let memtable = Arc::new(MemTable::new());
    let old: Vec<_> = (0..100).map(|i| (format!("old{}", i), vec![0u8])).collect();
    let new: Vec<_> = (0..100).map(|i| (format!("new{}", i), vec![1u8])).collect();
    memtable.replace(old.clone());

    let reader = {
        let memtable = Arc::clone(&memtable);
        thread::spawn(move || {
            for _ in 0..1000 {
                let entries = memtable.entries();
                let olds = entries.iter().filter(|(k, _)| k.starts_with("old")).count();
                let news = entries.iter().filter(|(k, _)| k.starts_with("new")).count();
                assert!(
                    (olds == 100 && news == 0) || (olds == 0 && news == 100),
                    "mixed view: {} old, {} new",
                    olds,
                    news
                );
            }
        })
    };

    for round in 0..200 {
        if round % 2 == 0 {
            memtable.replace(new.clone());
        } else {
            memtable.replace(old.clone());
        }
    }

    reader.join().unwrap();
}
