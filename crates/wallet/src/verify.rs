//! Pre-open checks for a wallet store location and its contents.

use crate::keys::parse_tag;
use crate::recover::{recover_all, RecoveryError, RecoveryReport};
use satchel_storage::Database;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Result of a verification pass. Warnings are advisory; an error means the
/// wallet should not be opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    fn fail(mut self, message: String) -> Self {
        warn!("{}", message);
        self.error = Some(message);
        self
    }
}

/// Check that the store can live at `path`.
pub fn verify_environment(path: &Path) -> Verification {
    let mut result = Verification::default();

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return result.fail(format!("directory {} does not exist", parent.display()));
    }

    match fs::metadata(path) {
        Ok(meta) => {
            if !meta.is_dir() {
                return result.fail(format!("{} is not a wallet store directory", path.display()));
            }
            if meta.permissions().readonly() {
                return result.fail(format!("{} is not writable", path.display()));
            }
        }
        Err(_) => result.warn(format!(
            "no wallet store at {}, a new one will be created",
            path.display()
        )),
    }

    let stale = stale_backups(path);
    if !stale.is_empty() {
        result.warn(format!(
            "{} salvage backup(s) found next to {}",
            stale.len(),
            path.display()
        ));
    }
    result
}

/// Open the store and read every record. If the scan fails, try to salvage
/// what is readable into a backup store.
pub fn verify_database_file(path: &Path) -> Verification {
    let mut result = Verification::default();
    if !path.exists() {
        return result;
    }

    let db = match Database::open(path) {
        Ok(db) => db,
        Err(e) => return result.fail(format!("failed to open {}: {}", path.display(), e)),
    };

    let mut unreadable = 0;
    let mut scan_error = None;
    for item in db.iter() {
        match item {
            Ok((key, _)) => {
                if parse_tag(&key).is_none() {
                    unreadable += 1;
                }
            }
            Err(e) => {
                scan_error = Some(e.to_string());
                break;
            }
        }
    }
    if scan_error.is_none() {
        if let Err(e) = db.checksum() {
            scan_error = Some(e.to_string());
        }
    }
    drop(db);

    if unreadable > 0 {
        result.warn(format!("{} record(s) with unreadable keys", unreadable));
    }

    let Some(reason) = scan_error else {
        info!(path = %path.display(), "wallet store verified");
        return result;
    };
    settle_damage(result, path, &reason, recover_all)
}

/// Decide the outcome for a store whose scan failed: a warning when
/// `salvage` rescued it into a backup, an error when it did not.
fn settle_damage<F>(mut result: Verification, path: &Path, reason: &str, salvage: F) -> Verification
where
    F: FnOnce(&Path) -> Result<RecoveryReport, RecoveryError>,
{
    match salvage(path) {
        Ok(report) => {
            result.warn(format!(
                "store is damaged ({}); salvaged {} record(s) to {}",
                reason,
                report.kept,
                report.backup_path.display()
            ));
            result
        }
        Err(e) => result.fail(format!("store is damaged ({}) and salvage failed: {}", reason, e)),
    }
}

fn stale_backups(path: &Path) -> Vec<std::path::PathBuf> {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return Vec::new();
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    let prefix = format!("{}.", name.to_string_lossy());
    let Ok(entries) = fs::read_dir(parent) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".bak"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{record_key, tags};
    use tempfile::TempDir;

    #[test]
    fn test_environment_missing_parent() {
        let dir = TempDir::new().unwrap();
        let result = verify_environment(&dir.path().join("nope").join("wallet"));
        assert!(!result.is_ok());
    }

    #[test]
    fn test_environment_fresh_location_warns() {
        let dir = TempDir::new().unwrap();
        let result = verify_environment(&dir.path().join("wallet"));
        assert!(result.is_ok());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_environment_rejects_plain_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet");
        fs::write(&path, b"not a store").unwrap();
        assert!(!verify_environment(&path).is_ok());
    }

    #[test]
    fn test_environment_reports_stale_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet");
        fs::create_dir(&path).unwrap();
        fs::create_dir(dir.path().join("wallet.1700000000.bak")).unwrap();

        let result = verify_environment(&path);
        assert!(result.is_ok());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("1 salvage"));
    }

    #[test]
    fn test_database_file_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        let result = verify_database_file(&dir.path().join("wallet"));
        assert_eq!(result, Verification::default());
    }

    #[test]
    fn test_database_file_healthy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet");
        {
            let db = Database::open(&path).unwrap();
            db.put_raw(record_key(tags::NAME, &1u8).unwrap(), b"x").unwrap();
            db.put_raw(b"\x02", b"odd").unwrap();
            db.flush().unwrap();
        }
        let result = verify_database_file(&path);
        assert!(result.is_ok());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_damaged_store_salvaged_is_warning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet");
        {
            let db = Database::open(&path).unwrap();
            db.put_raw(record_key(tags::NAME, &1u8).unwrap(), b"x").unwrap();
            db.flush().unwrap();
        }

        let result = settle_damage(Verification::default(), &path, "bad page", recover_all);
        assert!(result.is_ok());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("bad page"));
        assert!(result.warnings[0].contains("salvaged 1 record(s)"));
        assert_eq!(stale_backups(&path).len(), 1);
    }

    #[test]
    fn test_damaged_store_salvage_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet");
        let mut before = Verification::default();
        before.warnings.push("earlier".into());

        let result = settle_damage(before, &path, "bad page", |_| {
            Err(RecoveryError::NothingSalvaged)
        });
        assert!(!result.is_ok());
        assert_eq!(result.warnings, vec!["earlier".to_string()]);
        let error = result.error.unwrap();
        assert!(error.contains("bad page"));
        assert!(error.contains("no records could be salvaged"));
    }

    #[test]
    fn test_database_file_unopenable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet");
        fs::write(&path, b"not a store").unwrap();
        assert!(!verify_database_file(&path).is_ok());
    }
}
