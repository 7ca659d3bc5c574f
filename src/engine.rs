//! The snapshot engine: create, list, restore, delete and prune backups of
//! one source directory inside one backup-storage directory.
//!
//! The engine does no locking. Only one operation may run against a given
//! backup-storage directory at a time; see [`crate::worker`] for a queue that
//! serializes requests from an interactive caller.

use crate::archive;
use crate::config::Config;
use crate::constants::LOG_NAME;
use crate::error::{BackupError, Result};
use crate::file_util;
use crate::matcher::ExclusionMatcher;
use crate::report::Skipped;
use crate::version_log::{self, BackupRecord, VersionLog};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result of a successful `create`.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub record: BackupRecord,
    /// Files the walk could not read.
    pub skipped: Skipped,
}

/// Result of a `restore` that got through both phases.
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    /// Items of the source directory that could not be removed.
    pub not_deleted: Skipped,
    /// Archive entries that could not be written back.
    pub not_restored: Skipped,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.not_deleted.is_empty() && self.not_restored.is_empty()
    }
}

/// Result of a retention prune.
#[derive(Debug, Default)]
pub struct PruneReport {
    /// Identifiers of the deleted backups, oldest first.
    pub deleted: Vec<String>,
    /// Backups that should have been deleted but could not be.
    pub failed: Vec<(String, BackupError)>,
}

/// Snapshot engine scoped to one backup-storage directory.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    matcher: ExclusionMatcher,
    log: VersionLog,
}

impl Engine {
    /// Opens the engine for `config`, creating the backup-storage directory
    /// and loading its version log.
    ///
    /// `working_dir` is where the tool runs from; the tool's own files there
    /// are never backed up.
    pub fn new(config: Config, working_dir: &Path) -> Result<Self> {
        fs::create_dir_all(&config.backup_dir)?;
        let config = Config {
            source_dir: normalize(&config.source_dir),
            backup_dir: normalize(&config.backup_dir),
            ..config
        };
        let matcher = ExclusionMatcher::new(
            &config.backup_dir,
            normalize(working_dir),
            config.auto_exclude.clone(),
        );
        let log = VersionLog::load(config.backup_dir.join(LOG_NAME));
        Ok(Self {
            config,
            matcher,
            log,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn matcher(&self) -> &ExclusionMatcher {
        &self.matcher
    }

    /// Snapshots the source directory into a new archive and records it.
    pub fn create(&mut self, comment: &str) -> Result<CreateOutcome> {
        let source = &self.config.source_dir;
        if !source.is_dir() {
            return Err(BackupError::MissingSource(source.clone()));
        }

        let now = Local::now().naive_local();
        let id = format!(
            "v{:03}_{}",
            self.log.next_sequence(),
            now.format("%Y%m%d_%H%M%S")
        );
        let mut name = format!("{}_{}", self.config.project_name(), id);
        if !comment.is_empty() {
            name.push('_');
            name.push_str(&comment_slug(comment));
        }

        let compression = self.config.compression;
        let backend = archive::backend(compression);
        let path = backend.artifact_path(&self.config.backup_dir, &name);
        let skipped = backend.write(source, &self.matcher, &path)?;
        if !skipped.is_empty() {
            warn!(count = skipped.len(), "some files could not be backed up");
        }

        let record = BackupRecord {
            id,
            name,
            timestamp: now,
            path,
            comment: comment.to_string(),
            compression,
        };
        self.log.append(record.clone())?;
        info!(id = %record.id, path = %record.path.display(), "backup created");
        Ok(CreateOutcome { record, skipped })
    }

    /// Backups still present on disk, newest first.
    pub fn list(&mut self) -> Result<Vec<BackupRecord>> {
        self.log.list()
    }

    pub fn find(&self, id: &str) -> Option<&BackupRecord> {
        self.log.find(id)
    }

    /// Replaces the contents of the source directory with backup `id`.
    ///
    /// The archive is opened first; one that cannot be read aborts the
    /// restore with the source directory untouched. Otherwise every item in
    /// the source directory is removed, then the archive is unpacked into it. Items that fail in either phase are reported, not
    /// fatal, so a partial failure leaves a mix of old and restored files.
    /// The backup-storage directory and the tool's own files are left alone
    /// when they live inside the source directory.
    pub fn restore(&mut self, id: &str) -> Result<RestoreReport> {
        let record = self.existing_record(id)?;
        let backend = archive::backend(record.compression);
        backend.verify(&record.path)?;

        let source = self.config.source_dir.clone();
        fs::create_dir_all(&source)?;
        let not_deleted = self.clear_source(&source)?;
        let not_restored = backend.restore(&record.path, &source)?;

        let report = RestoreReport {
            not_deleted,
            not_restored,
        };
        info!(
            id,
            not_deleted = report.not_deleted.len(),
            not_restored = report.not_restored.len(),
            "backup restored"
        );
        Ok(report)
    }

    fn clear_source(&self, source: &Path) -> Result<Skipped> {
        let mut skipped = Skipped::new();
        for entry in fs::read_dir(source)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    skipped.push_error(source, &e);
                    continue;
                }
            };
            if self.matcher.is_structural(&path) || self.config.backup_dir.starts_with(&path) {
                continue;
            }
            if let Err(e) = file_util::remove_path(&path) {
                warn!(path = %path.display(), error = %e, "could not remove during restore");
                skipped.push_error(&path, &e);
            }
        }
        Ok(skipped)
    }

    /// Removes backup `id` from disk and from the log.
    pub fn delete(&mut self, id: &str) -> Result<BackupRecord> {
        let record = self.existing_record(id)?;
        file_util::remove_path(&record.path)?;
        self.log.remove(id)?;
        info!(id, path = %record.path.display(), "backup deleted");
        Ok(record)
    }

    /// Deletes the oldest backups until at most `max_backups` remain.
    ///
    /// Stale records are reconciled away first. Each deletion is independent:
    /// one failure does not stop the rest.
    pub fn prune(&mut self) -> Result<PruneReport> {
        let mut records = self.log.list()?;
        let max = self.config.max_backups;
        let mut report = PruneReport::default();
        if records.len() <= max {
            return Ok(report);
        }

        version_log::sort_by_age(&mut records);
        let excess = records.len() - max;
        for record in records.into_iter().take(excess) {
            match self.delete(&record.id) {
                Ok(_) => report.deleted.push(record.id),
                Err(e) => {
                    warn!(id = %record.id, error = %e, "could not prune backup");
                    report.failed.push((record.id, e));
                }
            }
        }
        info!(deleted = report.deleted.len(), max, "retention prune finished");
        Ok(report)
    }

    fn existing_record(&self, id: &str) -> Result<BackupRecord> {
        let record = self
            .log
            .find(id)
            .cloned()
            .ok_or_else(|| BackupError::NotFound(id.to_string()))?;
        if !record.exists() {
            return Err(BackupError::MissingArchive(record.path));
        }
        Ok(record)
    }
}

/// Comment text made safe for a file name.
fn comment_slug(comment: &str) -> String {
    comment
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

/// Absolute, symlink-resolved form of `path` when it exists; the path itself otherwise.
fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
