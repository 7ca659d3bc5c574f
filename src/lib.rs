//! vbackup: point-in-time backups of a single project directory.
//!
//! This crate provides the snapshot engine behind the `vbk` CLI: exclusion
//! matching, the zip and mirrored-directory archive backends, the
//! self-healing version log, and the create/list/restore/delete/prune
//! operations built on them.

pub mod archive;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod file_util;
pub mod matcher;
pub mod path_util;
pub mod report;
pub mod version_log;
pub mod worker;

pub use config::{Config, ConfigFile};
pub use engine::{CreateOutcome, Engine, PruneReport, RestoreReport};
pub use error::{BackupError, Result};
pub use version_log::BackupRecord;
