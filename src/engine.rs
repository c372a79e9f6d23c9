//! Engine Module
//!
//! The storage engine shared by every connection.
//!
//! ## Responsibilities
//! - Own the in-memory record set
//! - Write snapshots on SAVE and load them on startup
//! - Execute parsed commands and build their replies

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::memtable::MemTable;
use crate::protocol::{Command, Value, NIL_REPLY};
use crate::storage::snapshot;

/// The main storage engine
///
/// ## Concurrency Model
///
/// - **get / set / delete**: linearizable through the MemTable's RwLock.
///   Many readers at once, one writer at a time.
/// - **save**: serialized by `save_lock`, so two SAVEs never race on the
///   snapshot file. The record set is copied under the read lock, which makes
///   each snapshot a point-in-time view; callers should still treat snapshot
///   consistency under concurrent writes as best-effort.
/// - **load_from_disk**: builds the new set off-lock and swaps it in, so
///   readers never observe a partially loaded map.
pub struct Engine {
    /// Where `save` writes the snapshot
    snapshot_path: PathBuf,

    /// In-memory records (internal RwLock)
    memtable: MemTable,

    /// Serializes snapshot writers
    save_lock: Mutex<()>,
}

impl Engine {
    /// Create an empty engine that saves to `snapshot_path`
    ///
    /// Does not read the snapshot; see [`Engine::open`].
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            memtable: MemTable::new(),
            save_lock: Mutex::new(()),
        }
    }

    /// Create an engine and restore the snapshot at `config.snapshot_path`
    ///
    /// A missing snapshot is the first-run case and yields an empty engine.
    /// An unreadable or corrupt snapshot is an error.
    pub fn open(config: &Config) -> Result<Self> {
        let engine = Self::new(config.snapshot_path.clone());

        if engine.load_from_disk(&config.snapshot_path)? {
            tracing::info!(
                "Loaded {} keys from {}",
                engine.len(),
                config.snapshot_path.display()
            );
        } else {
            tracing::info!(
                "No snapshot at {}, starting empty",
                config.snapshot_path.display()
            );
        }

        Ok(engine)
    }

    /// Open with a snapshot path (convenience method)
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().snapshot_path(path).build();
        Self::open(&config)
    }

    /// Execute a command and build its reply
    ///
    /// Never fails: every outcome, including a failed SAVE, is a reply value.
    pub fn execute(&self, command: Command) -> Value {
        match command {
            Command::Ping { message: None } => Value::simple("PONG"),
            Command::Ping { message: Some(message) } => Value::from_message(message),
            Command::Echo { message } => Value::from_message(message.unwrap_or_default()),
            Command::Set { key, value } => {
                self.set(key, value);
                Value::ok()
            }
            Command::Get { key } => match self.get(&key) {
                Some(value) => Value::bulk(value),
                None => Value::error(NIL_REPLY),
            },
            Command::Del { key } => {
                self.delete(&key);
                Value::ok()
            }
            Command::MSet { pairs } => {
                self.memtable.put_many(pairs);
                Value::ok()
            }
            Command::MGet { keys } => {
                let values = self.memtable.get_many(keys.iter().map(String::as_str));
                Value::array(
                    values
                        .into_iter()
                        .map(|value| Value::bulk(value.unwrap_or_else(|| NIL_REPLY.into())))
                        .collect(),
                )
            }
            Command::Save => match self.save() {
                Ok(()) => Value::ok(),
                Err(e) => {
                    tracing::warn!("SAVE failed: {}", e);
                    // The text may quote the snapshot path; keep it on one line
                    Value::error(e.to_string().replace(['\r', '\n'], " "))
                }
            },
        }
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.memtable.get(key)
    }

    /// Insert or overwrite a key
    pub fn set(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.memtable.put(key.into(), value.into());
    }

    /// Delete a key (no-op if absent)
    pub fn delete(&self, key: &str) {
        self.memtable.delete(key);
    }

    /// Write the full record set to the configured snapshot path
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.snapshot_path)
    }

    /// Write the full record set to `path`, replacing any previous snapshot
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let _save_guard = self.save_lock.lock();

        let entries = self.memtable.entries();
        let bytes = snapshot::write_snapshot(path, &entries)?;

        tracing::debug!(
            "Saved {} keys ({} bytes) to {}",
            entries.len(),
            bytes,
            path.display()
        );
        Ok(())
    }

    /// Replace the in-memory records with the snapshot at `path`
    ///
    /// Returns `Ok(false)` (and leaves the records untouched) if the file does
    /// not exist.
    pub fn load_from_disk(&self, path: &Path) -> Result<bool> {
        match snapshot::read_snapshot(path)? {
            Some(entries) => {
                self.memtable.replace(entries);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of keys
    pub fn len(&self) -> usize {
        self.memtable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memtable.is_empty()
    }

    /// Drop every key from memory (the snapshot file is untouched)
    pub fn clear(&self) {
        self.memtable.clear();
    }

    /// Get the snapshot path
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }
}
