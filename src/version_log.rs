//! The version log: an ordered record of every backup in one
//! backup-storage directory.
//!
//! The log is a cache over what is actually on disk. Listing reconciles it
//! against the filesystem, dropping records whose archive vanished and
//! persisting the correction straight away. Every mutation rewrites the
//! whole document.

use crate::error::Result;
use crate::file_util;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One snapshot recorded in the log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BackupRecord {
    /// Version identifier, `v{sequence:03}_{yyyymmdd_HHMMSS}`.
    pub id: String,
    /// Display name, also the archive's file stem.
    pub name: String,
    pub timestamp: NaiveDateTime,
    /// Absolute path of the zip file or mirrored directory.
    pub path: PathBuf,
    #[serde(default)]
    pub comment: String,
    /// Which backend produced the archive.
    pub compression: bool,
}

impl BackupRecord {
    /// Sequence number embedded in the identifier, if it parses.
    pub fn sequence(&self) -> Option<u32> {
        let rest = self.id.strip_prefix('v')?;
        let digits = rest.split('_').next()?;
        digits.parse().ok()
    }

    /// Whether the archive this record points to is still on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Persisted, ordered sequence of [`BackupRecord`]s.
#[derive(Debug)]
pub struct VersionLog {
    path: PathBuf,
    records: Vec<BackupRecord>,
}

impl VersionLog {
    /// Reads the log document at `path`.
    ///
    /// A missing document starts an empty log; an unreadable or malformed
    /// one is discarded with a warning.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = if path.exists() {
            match read_records(&path) {
                Ok(records) => records,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding unreadable version log");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        Self { path, records }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records in insertion order, without reconciling against disk.
    pub fn records(&self) -> &[BackupRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&BackupRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Sequence number for the next identifier.
    ///
    /// This is the log length plus one, raised past the highest sequence
    /// still recorded so that gaps left by deletions never produce a clash.
    pub fn next_sequence(&self) -> u32 {
        let highest = self
            .records
            .iter()
            .filter_map(BackupRecord::sequence)
            .max()
            .unwrap_or(0);
        let by_len = u32::try_from(self.records.len()).unwrap_or(u32::MAX);
        highest.max(by_len).saturating_add(1)
    }

    /// Returns the records newest first, after pruning any whose archive no
    /// longer exists. A prune is persisted before returning.
    pub fn list(&mut self) -> Result<Vec<BackupRecord>> {
        let before = self.records.len();
        self.records.retain(|record| {
            let keep = record.exists();
            if !keep {
                warn!(id = %record.id, path = %record.path.display(), "pruning log entry with missing archive");
            }
            keep
        });
        if self.records.len() != before {
            self.persist()?;
        }

        let mut sorted = self.records.clone();
        sort_by_age(&mut sorted);
        sorted.reverse();
        Ok(sorted)
    }

    pub fn append(&mut self, record: BackupRecord) -> Result<()> {
        self.records.push(record);
        self.persist()
    }

    /// Removes the record with `id`, persisting if one was removed.
    pub fn remove(&mut self, id: &str) -> Result<Option<BackupRecord>> {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let record = self.records.remove(index);
        self.persist()?;
        Ok(Some(record))
    }

    fn persist(&self) -> Result<()> {
        file_util::write_json_atomic(&self.path, &self.records)
    }
}

fn read_records(path: &Path) -> Result<Vec<BackupRecord>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Sorts oldest first, by timestamp and then by sequence.
pub fn sort_by_age(records: &mut [BackupRecord]) {
    records.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.sequence().cmp(&b.sequence()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn record(dir: &Path, seq: u32, second: u32) -> BackupRecord {
        let timestamp = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, second)
            .unwrap();
        let id = format!("v{seq:03}_{}", timestamp.format("%Y%m%d_%H%M%S"));
        let path = dir.join(format!("demo_{id}.zip"));
        fs::write(&path, b"zip").unwrap();
        BackupRecord {
            name: format!("demo_{id}"),
            id,
            timestamp,
            path,
            comment: String::new(),
            compression: true,
        }
    }

    #[test]
    fn test_sequence_parsing() {
        let temp_dir = TempDir::new().unwrap();
        let r = record(temp_dir.path(), 7, 0);
        assert_eq!(r.sequence(), Some(7));
        let odd = BackupRecord {
            id: "manual".into(),
            ..r
        };
        assert_eq!(odd.sequence(), None);
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backup_log.json");
        assert!(VersionLog::load(&path).is_empty());

        fs::write(&path, "[{ broken").unwrap();
        assert!(VersionLog::load(&path).is_empty());
    }

    #[test]
    fn test_append_persists_and_reloads() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("backup_log.json");
        let mut log = VersionLog::load(&path);
        log.append(record(temp_dir.path(), 1, 0))?;
        log.append(record(temp_dir.path(), 2, 1))?;

        let reloaded = VersionLog::load(&path);
        assert_eq!(reloaded.records(), log.records());
        assert!(reloaded.find("v002_20250101_120001").is_some());
        Ok(())
    }

    #[test]
    fn test_list_sorts_newest_first() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut log = VersionLog::load(temp_dir.path().join("backup_log.json"));
        log.append(record(temp_dir.path(), 1, 5))?;
        log.append(record(temp_dir.path(), 2, 9))?;
        log.append(record(temp_dir.path(), 3, 7))?;

        let ids: Vec<_> = log.list()?.into_iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                "v002_20250101_120009",
                "v003_20250101_120007",
                "v001_20250101_120005"
            ]
        );
        Ok(())
    }

    #[test]
    fn test_list_prunes_missing_archives_idempotently() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("backup_log.json");
        let mut log = VersionLog::load(&path);
        let gone = record(temp_dir.path(), 1, 0);
        log.append(gone.clone())?;
        log.append(record(temp_dir.path(), 2, 1))?;
        fs::remove_file(&gone.path)?;

        let first = log.list()?;
        let second = log.list()?;
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(VersionLog::load(&path).len(), 1);
        assert!(VersionLog::load(&path).find(&gone.id).is_none());
        Ok(())
    }

    #[test]
    fn test_remove() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("backup_log.json");
        let mut log = VersionLog::load(&path);
        let r = record(temp_dir.path(), 1, 0);
        log.append(r.clone())?;

        assert_eq!(log.remove("v999_missing")?, None);
        assert_eq!(log.remove(&r.id)?, Some(r));
        assert!(VersionLog::load(&path).is_empty());
        Ok(())
    }

    #[test]
    fn test_next_sequence_never_clashes_after_deletion() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut log = VersionLog::load(temp_dir.path().join("backup_log.json"));
        assert_eq!(log.next_sequence(), 1);
        log.append(record(temp_dir.path(), 1, 0))?;
        log.append(record(temp_dir.path(), 2, 1))?;
        assert_eq!(log.next_sequence(), 3);

        log.remove("v001_20250101_120000")?;
        assert_eq!(log.next_sequence(), 3);
        Ok(())
    }

    #[test]
    fn test_reads_legacy_timestamps() {
        let json = r#"[{
            "id": "v001_20250101_120000",
            "name": "demo_v001_20250101_120000",
            "timestamp": "2025-01-01T12:00:00.123456",
            "path": "/backups/demo_v001_20250101_120000.zip",
            "comment": "",
            "compression": true
        }]"#;
        let records: Vec<BackupRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].sequence(), Some(1));
        assert_eq!(
            records[0].timestamp.format("%Y%m%d_%H%M%S").to_string(),
            "20250101_120000"
        );
    }
}
