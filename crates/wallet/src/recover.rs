//! Raw-record salvage into a fresh backup store.
//!
//! Recovery issues no record writes against the damaged store. It walks the
//! raw key/value pairs the engine can still reach, offers each to a filter,
//! and copies the accepted pairs byte-for-byte into a new store next to the
//! original.
//!
//! Opening the damaged store is a normal sled open, and sled may rewrite its
//! own log and snapshot files in that directory while doing so. Stored
//! records are never changed, but the files on disk are not guaranteed to
//! stay byte-identical.

use crate::keys::{is_key_type, parse_tag};
use satchel_storage::{BatchOp, Database, StorageError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Recovery failures. No record of the original store is changed in any case.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("no wallet store at {0}")]
    NotFound(PathBuf),

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    #[error("backup path {0} already exists")]
    BackupExists(PathBuf),

    #[error("failed to create backup store {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    #[error("failed to write salvaged records: {0}")]
    Write(#[source] StorageError),

    #[error("no records could be salvaged")]
    NothingSalvaged,
}

/// Outcome of a successful salvage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub backup_path: PathBuf,
    pub kept: usize,
    pub dropped: usize,
    /// Problems that ended the scan early; records before them were kept.
    pub warnings: Vec<String>,
}

/// Salvage every record the filter accepts into a new timestamped backup
/// store next to `path`.
pub fn recover<F>(path: &Path, filter: F) -> Result<RecoveryReport, RecoveryError>
where
    F: FnMut(&[u8], &[u8]) -> bool,
{
    let backup_path = backup_path_for(path);
    recover_to(path, &backup_path, filter)
}

/// Salvage into an explicit backup location, which must not exist yet.
pub fn recover_to<F>(
    path: &Path,
    backup_path: &Path,
    mut filter: F,
) -> Result<RecoveryReport, RecoveryError>
where
    F: FnMut(&[u8], &[u8]) -> bool,
{
    if !path.exists() {
        return Err(RecoveryError::NotFound(path.to_path_buf()));
    }
    if backup_path.exists() {
        return Err(RecoveryError::BackupExists(backup_path.to_path_buf()));
    }

    let source = Database::open(path).map_err(|source| RecoveryError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut ops = Vec::new();
    let mut dropped = 0;
    let mut warnings = Vec::new();
    for item in source.iter() {
        match item {
            Ok((key, value)) => {
                if filter(&key, &value) {
                    ops.push(BatchOp::Insert { key, value });
                } else {
                    dropped += 1;
                }
            }
            Err(e) => {
                warn!(error = %e, "salvage scan stopped early");
                warnings.push(format!("scan stopped after {} records: {}", ops.len() + dropped, e));
                break;
            }
        }
    }
    drop(source);

    let kept = ops.len();
    if kept == 0 {
        return Err(RecoveryError::NothingSalvaged);
    }

    if let Err(e) = write_backup(backup_path, ops) {
        if let Err(cleanup) = fs::remove_dir_all(backup_path) {
            warn!(path = %backup_path.display(), error = %cleanup, "failed to remove partial backup");
        }
        return Err(e);
    }

    info!(
        backup = %backup_path.display(),
        kept,
        dropped,
        warnings = warnings.len(),
        "salvaged wallet records"
    );
    Ok(RecoveryReport {
        backup_path: backup_path.to_path_buf(),
        kept,
        dropped,
        warnings,
    })
}

fn write_backup(backup_path: &Path, ops: Vec<BatchOp>) -> Result<(), RecoveryError> {
    let backup = Database::open(backup_path).map_err(|source| RecoveryError::Backup {
        path: backup_path.to_path_buf(),
        source,
    })?;
    backup.apply(ops).map_err(RecoveryError::Write)?;
    backup.flush().map_err(RecoveryError::Write)
}

/// Salvage everything still readable.
pub fn recover_all(path: &Path) -> Result<RecoveryReport, RecoveryError> {
    recover(path, |_, _| true)
}

/// Filter keeping only records that hold key material.
pub fn recover_keys_only_filter(key: &[u8], _value: &[u8]) -> bool {
    parse_tag(key).is_some_and(|tag| is_key_type(&tag))
}

/// `<path>.<unix-seconds>.bak`, with a counter appended if that is taken.
pub fn backup_path_for(path: &Path) -> PathBuf {
    let base = format!("{}.{}", path.display(), chrono::Utc::now().timestamp());
    let mut candidate = PathBuf::from(format!("{}.bak", base));
    let mut n = 1;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{}-{}.bak", base, n));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{record_key, tags};
    use tempfile::TempDir;

    fn populated(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("wallet");
        let db = Database::open(&path).unwrap();
        db.put_raw(record_key(tags::KEY, &vec![1u8; 33]).unwrap(), b"k1").unwrap();
        db.put_raw(record_key(tags::MASTER_KEY, &1u32).unwrap(), b"m1").unwrap();
        db.put_raw(record_key(tags::NAME, &7u8).unwrap(), b"n").unwrap();
        db.put_raw(record_key(tags::TX, &[3u8; 32]).unwrap(), b"t").unwrap();
        db.flush().unwrap();
        path
    }

    #[test]
    fn test_keys_only_filter() {
        assert!(recover_keys_only_filter(&record_key(tags::CRYPTED_KEY, &1u8).unwrap(), b""));
        assert!(!recover_keys_only_filter(&record_key(tags::KEYMETA, &1u8).unwrap(), b""));
        assert!(!recover_keys_only_filter(b"\x01", b""));
    }

    #[test]
    fn test_recover_all_copies_everything() {
        let dir = TempDir::new().unwrap();
        let path = populated(&dir);

        let report = recover_all(&path).unwrap();
        assert_eq!(report.kept, 4);
        assert_eq!(report.dropped, 0);
        assert!(report.warnings.is_empty());
        assert!(report.backup_path.to_string_lossy().ends_with(".bak"));

        let backup = Database::open(&report.backup_path).unwrap();
        assert_eq!(backup.len(), 4);
    }

    #[test]
    fn test_recover_keys_only() {
        let dir = TempDir::new().unwrap();
        let path = populated(&dir);

        let report = recover(&path, recover_keys_only_filter).unwrap();
        assert_eq!(report.kept, 2);
        assert_eq!(report.dropped, 2);

        // The original store's records are untouched
        let original = Database::open(&path).unwrap();
        assert_eq!(original.len(), 4);
    }

    #[test]
    fn test_nothing_salvaged() {
        let dir = TempDir::new().unwrap();
        let path = populated(&dir);
        let backup = dir.path().join("out.bak");

        let err = recover_to(&path, &backup, |_, _| false).unwrap_err();
        assert!(matches!(err, RecoveryError::NothingSalvaged));
        assert!(!backup.exists());
    }

    #[test]
    fn test_missing_store() {
        let dir = TempDir::new().unwrap();
        let err = recover_all(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, RecoveryError::NotFound(_)));
    }

    #[test]
    fn test_existing_backup_refused() {
        let dir = TempDir::new().unwrap();
        let path = populated(&dir);
        let backup = dir.path().join("taken");
        fs::create_dir(&backup).unwrap();

        let err = recover_to(&path, &backup, |_, _| true).unwrap_err();
        assert!(matches!(err, RecoveryError::BackupExists(_)));
    }

    #[test]
    fn test_backup_path_is_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet");
        let first = backup_path_for(&path);
        fs::create_dir(&first).unwrap();
        let second = backup_path_for(&path);
        assert_ne!(first, second);
        assert!(!second.exists());
    }
}
