//! Tests for Engine
//!
//! These tests verify:
//! - Basic get/set/delete operations
//! - Command execution and reply shapes
//! - Snapshot save and restore
//! - Concurrent access patterns
//! - Engine lifecycle (open on missing or corrupt snapshots)

use std::fs;
use std::sync::Arc;
use std::thread;

use retainkv::config::Config;
use retainkv::engine::Engine;
use retainkv::protocol::{encode, Command, Value};
use retainkv::RetainError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .snapshot_path(temp_dir.path().join("retain.db"))
        .build();
    let engine = Engine::open(&config).unwrap();
    (temp_dir, engine)
}

fn set(key: &str, value: &[u8]) -> Command {
    Command::Set {
        key: key.to_string(),
        value: value.to_vec(),
    }
}

fn get(key: &str) -> Command {
    Command::Get {
        key: key.to_string(),
    }
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_without_snapshot_is_empty() {
    let (temp_dir, engine) = setup_temp_engine();

    assert!(engine.is_empty());
    assert_eq!(engine.snapshot_path(), temp_dir.path().join("retain.db"));
    // Opening never creates the file
    assert!(!temp_dir.path().join("retain.db").exists());
}

#[test]
fn test_set_get_delete() {
    let (_temp_dir, engine) = setup_temp_engine();

    engine.set("k", "v");
    assert_eq!(engine.get("k"), Some(b"v".to_vec()));

    engine.set("k", "v2");
    assert_eq!(engine.get("k"), Some(b"v2".to_vec()));
    assert_eq!(engine.len(), 1);

    engine.delete("k");
    assert_eq!(engine.get("k"), None);

    // Deleting again is a no-op
    engine.delete("k");
    assert!(engine.is_empty());
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_execute_ping() {
    let (_temp_dir, engine) = setup_temp_engine();

    assert_eq!(
        engine.execute(Command::Ping { message: None }),
        Value::simple("PONG")
    );
    assert_eq!(
        engine.execute(Command::Ping {
            message: Some(b"hello".to_vec())
        }),
        Value::simple("hello")
    );
}

#[test]
fn test_execute_echo() {
    let (_temp_dir, engine) = setup_temp_engine();

    assert_eq!(
        engine.execute(Command::Echo {
            message: Some(b"hi there".to_vec())
        }),
        Value::simple("hi there")
    );
    assert_eq!(
        engine.execute(Command::Echo { message: None }),
        Value::simple("")
    );

    // Text that can't sit on one line comes back as a bulk string
    assert_eq!(
        engine.execute(Command::Echo {
            message: Some(b"a\r\nb".to_vec())
        }),
        Value::bulk("a\r\nb")
    );
}

#[test]
fn test_execute_set_get() {
    let (_temp_dir, engine) = setup_temp_engine();

    assert_eq!(engine.execute(set("name", b"retain")), Value::ok());
    assert_eq!(engine.execute(get("name")), Value::bulk("retain"));
}

#[test]
fn test_execute_get_missing_is_error_reply() {
    let (_temp_dir, engine) = setup_temp_engine();

    assert_eq!(engine.execute(get("missing")), Value::error("(nil)"));
}

#[test]
fn test_execute_del() {
    let (_temp_dir, engine) = setup_temp_engine();

    engine.execute(set("k", b"v"));
    let del = || {
        engine.execute(Command::Del {
            key: "k".to_string(),
        })
    };

    assert_eq!(del(), Value::ok());
    assert_eq!(del(), Value::ok());
    assert_eq!(engine.execute(get("k")), Value::error("(nil)"));
}

#[test]
fn test_execute_mset_mget() {
    let (_temp_dir, engine) = setup_temp_engine();

    let reply = engine.execute(Command::MSet {
        pairs: vec![
            ("a".to_string(), b"1".to_vec()),
            ("b".to_string(), b"2".to_vec()),
        ],
    });
    assert_eq!(reply, Value::ok());

    let reply = engine.execute(Command::MGet {
        keys: vec!["a".to_string(), "missing".to_string(), "b".to_string()],
    });
    assert_eq!(
        reply,
        Value::array(vec![Value::bulk("1"), Value::bulk("(nil)"), Value::bulk("2")])
    );
}

#[test]
fn test_execute_mset_last_duplicate_wins() {
    let (_temp_dir, engine) = setup_temp_engine();

    engine.execute(Command::MSet {
        pairs: vec![
            ("k".to_string(), b"first".to_vec()),
            ("k".to_string(), b"second".to_vec()),
        ],
    });

    assert_eq!(engine.get("k"), Some(b"second".to_vec()));
}

#[test]
fn test_binary_values_survive() {
    let (_temp_dir, engine) = setup_temp_engine();
    let value = vec![0x00, b'\r', b'\n', 0xff, b'$', b'-', b'1'];

    engine.execute(set("bin", &value));
    assert_eq!(engine.execute(get("bin")), Value::bulk(value));
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_save_then_load_restores_records() {
    let (temp_dir, engine) = setup_temp_engine();

    engine.set("a", "1");
    engine.set("b", vec![0u8, 1, 2]);
    assert_eq!(engine.execute(Command::Save), Value::ok());
    assert!(temp_dir.path().join("retain.db").exists());

    engine.clear();
    engine.set("after-save", "gone");
    assert!(engine.load_from_disk(engine.snapshot_path()).unwrap());

    assert_eq!(engine.len(), 2);
    assert_eq!(engine.get("a"), Some(b"1".to_vec()));
    assert_eq!(engine.get("b"), Some(vec![0u8, 1, 2]));
    assert_eq!(engine.get("after-save"), None);
}

#[test]
fn test_reopen_restores_records() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("retain.db");

    {
        let engine = Engine::open_path(&path).unwrap();
        for i in 0..100 {
            engine.set(format!("key{}", i), format!("value{}", i));
        }
        engine.save().unwrap();
    }

    let engine = Engine::open_path(&path).unwrap();
    assert_eq!(engine.len(), 100);
    for i in 0..100 {
        assert_eq!(
            engine.get(&format!("key{}", i)),
            Some(format!("value{}", i).into_bytes())
        );
    }
}

#[test]
fn test_load_missing_file_leaves_records() {
    let (temp_dir, engine) = setup_temp_engine();

    engine.set("keep", "me");
    let loaded = engine
        .load_from_disk(&temp_dir.path().join("nothing-here.db"))
        .unwrap();

    assert!(!loaded);
    assert_eq!(engine.get("keep"), Some(b"me".to_vec()));
}

#[test]
fn test_save_to_other_path() {
    let (temp_dir, engine) = setup_temp_engine();
    let other = temp_dir.path().join("backup.db");

    engine.set("k", "v");
    engine.save_to(&other).unwrap();

    assert!(other.exists());
    assert!(!engine.snapshot_path().exists());

    let restored = Engine::open_path(&other).unwrap();
    assert_eq!(restored.get("k"), Some(b"v".to_vec()));
}

#[test]
fn test_open_corrupt_snapshot_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("retain.db");
    fs::write(&path, b"garbage garbage garbage").unwrap();

    let result = Engine::open_path(&path);
    assert!(matches!(result, Err(RetainError::Persistence(_))));
}

#[test]
fn test_save_failure_is_error_reply() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::new(temp_dir.path().join("missing-dir").join("retain.db"));
    engine.set("k", "v");

    let reply = engine.execute(Command::Save);
    assert!(reply.is_error(), "expected error reply, got {:?}", reply);

    // The engine keeps serving
    assert_eq!(engine.execute(get("k")), Value::bulk("v"));
}

#[test]
fn test_save_failure_reply_stays_on_one_line() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::new(
        temp_dir
            .path()
            .join("missing\r\ndir")
            .join("retain.db"),
    );
    engine.set("k", "v");

    let reply = engine.execute(Command::Save);
    match &reply {
        Value::Error(text) => {
            assert!(text.contains("missing"), "unexpected reply text: {}", text);
            assert!(!text.contains('\r') && !text.contains('\n'));
        }
        other => panic!("expected error reply, got {:?}", other),
    }

    // The reply can go on the wire
    assert!(encode(&reply).is_ok());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_clients_disjoint_keys() {
    let (_temp_dir, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("t{}-{}", t, i);
                    engine.execute(set(&key, key.as_bytes()));
                    assert_eq!(engine.execute(get(&key)), Value::bulk(key.clone()));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.len(), 8 * 200);
}

#[test]
fn test_concurrent_saves_leave_valid_snapshot() {
    let (_temp_dir, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    for i in 0..500 {
        engine.set(format!("base{}", i), "x");
    }

    let savers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..10 {
                    assert_eq!(engine.execute(Command::Save), Value::ok());
                }
            })
        })
        .collect();

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..500 {
                engine.set(format!("live{}", i), "y");
            }
        })
    };

    for handle in savers {
        handle.join().unwrap();
    }
    writer.join().unwrap();

    let restored = Engine::open_path(engine.snapshot_path()).unwrap();
    assert!(restored.len() >= 500);
    assert_eq!(restored.get("base0"), Some(b"x".to_vec()));
}
