//! Snapshot files
//!
//! Encodes the record set into the versioned snapshot format and moves it to
//! and from disk.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RetainError, Result};

/// Magic bytes identifying a RetainKV snapshot file
pub(crate) const MAGIC: &[u8; 4] = b"RTKV";

/// Current snapshot format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + BodyLen (8) = 14 bytes
pub const HEADER_SIZE: usize = 14;

/// Footer size: BodyCRC (4) = 4 bytes
pub const FOOTER_SIZE: usize = 4;

// =============================================================================
// Body records
// =============================================================================

/// One key/value pair as written to the body
#[derive(Serialize)]
struct RecordRef<'a> {
    key: &'a str,
    value: &'a [u8],
}

/// One key/value pair as read back from the body
///
/// Same field order and types as [`RecordRef`], so bincode lays both out
/// identically.
#[derive(Debug, Deserialize)]
struct Record {
    key: String,
    value: Vec<u8>,
}

// =============================================================================
// In-memory encoding
// =============================================================================

/// Encode records into snapshot bytes
pub fn encode_snapshot(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let records: Vec<RecordRef<'_>> = entries
        .iter()
        .map(|(key, value)| RecordRef { key, value })
        .collect();
    let body = bincode::serialize(&records)
        .map_err(|e| RetainError::Serialization(format!("snapshot encode failed: {}", e)))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len() + FOOTER_SIZE);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&(body.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&body);
    bytes.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());

    Ok(bytes)
}

/// Decode snapshot bytes back into records
pub fn decode_snapshot(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(RetainError::Persistence(format!(
            "snapshot too short: {} bytes",
            bytes.len()
        )));
    }

    if &bytes[0..4] != MAGIC {
        return Err(RetainError::Persistence(format!(
            "invalid snapshot magic: expected RTKV, got {:?}",
            &bytes[0..4]
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(RetainError::Persistence(format!(
            "unsupported snapshot version: {}",
            version
        )));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[6..HEADER_SIZE]);
    let body_len = u64::from_le_bytes(len_bytes);

    // body_len comes from the file and may be anything
    let size_matches = body_len
        .checked_add((HEADER_SIZE + FOOTER_SIZE) as u64)
        .map_or(false, |expected| expected == bytes.len() as u64);
    if !size_matches {
        return Err(RetainError::Persistence(format!(
            "snapshot size mismatch: header declares a {} byte body, file has {} bytes",
            body_len,
            bytes.len()
        )));
    }

    let body_end = HEADER_SIZE + body_len as usize;
    let body = &bytes[HEADER_SIZE..body_end];

    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&bytes[body_end..]);
    let stored_crc = u32::from_le_bytes(crc_bytes);
    let actual_crc = crc32fast::hash(body);
    if stored_crc != actual_crc {
        return Err(RetainError::Persistence(format!(
            "snapshot checksum mismatch: stored {:08x}, computed {:08x}",
            stored_crc, actual_crc
        )));
    }

    let records: Vec<Record> = bincode::deserialize(body)
        .map_err(|e| RetainError::Serialization(format!("snapshot decode failed: {}", e)))?;

    Ok(records
        .into_iter()
        .map(|record| (record.key, record.value))
        .collect())
}

// =============================================================================
// File I/O
// =============================================================================

/// Write records to `path`, replacing any previous snapshot
///
/// The bytes go to a sibling `.tmp` file which is synced and then renamed
/// over `path`, so readers never see a half-written snapshot.
/// Returns the number of bytes written.
pub fn write_snapshot(path: &Path, entries: &[(String, Vec<u8>)]) -> Result<u64> {
    let bytes = encode_snapshot(entries)?;
    let temp_path = temp_path(path)?;

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| persistence_error("cannot open", &temp_path, e))?;

    let mut writer = BufWriter::new(file);
    writer
        .write_all(&bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| persistence_error("cannot write", &temp_path, e))?;

    let file: File = writer
        .into_inner()
        .map_err(|e| persistence_error("cannot flush", &temp_path, e.into_error()))?;
    file.sync_all()
        .map_err(|e| persistence_error("cannot sync", &temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| persistence_error("cannot replace", path, e))?;

    Ok(bytes.len() as u64)
}

/// Read records from `path`
///
/// Returns `Ok(None)` if the file does not exist.
pub fn read_snapshot(path: &Path) -> Result<Option<Vec<(String, Vec<u8>)>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(persistence_error("cannot read", path, e)),
    };

    decode_snapshot(&bytes).map(Some)
}

/// `retain.db` → `retain.db.tmp`
fn temp_path(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        RetainError::Persistence(format!("snapshot path {} has no file name", path.display()))
    })?;

    let mut temp_name = OsString::from(name);
    temp_name.push(".tmp");
    Ok(path.with_file_name(temp_name))
}

fn persistence_error(action: &str, path: &Path, err: io::Error) -> RetainError {
    RetainError::Persistence(format!("{} {}: {}", action, path.display(), err))
}
