//! Error taxonomy for vbackup.
//!
//! Per-item failures during a bulk walk are not errors: they are collected
//! into [`crate::report::Skipped`]. A [`BackupError`] always means the whole
//! operation failed.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for all engine operations.
#[derive(Error, Debug)]
pub enum BackupError {
    /// No record in the version log carries this identifier.
    #[error("Version not found: {0}")]
    NotFound(String),

    /// The record exists but its archive is gone from disk.
    #[error("Backup archive does not exist: {}", .0.display())]
    MissingArchive(PathBuf),

    /// The source directory to back up does not exist.
    #[error("Source directory does not exist: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The background worker has shut down and can no longer take requests.
    #[error("Backup worker is no longer running")]
    WorkerStopped,
}

impl BackupError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if the record's archive has vanished
    pub fn is_missing_archive(&self) -> bool {
        matches!(self, Self::MissingArchive(_))
    }
}

/// Result type alias for vbackup operations.
pub type Result<T> = std::result::Result<T, BackupError>;
