//! Persistent configuration for this application.
//!
//! The configuration document lives in the working directory as
//! `config.json`. It is created with defaults on first run, and any field a
//! user document leaves out falls back to its default. Setters never mutate a
//! shared configuration in place: they persist the change and hand back the
//! updated [`Config`].

use crate::constants::{CONFIG_NAME, DEFAULT_BACKUP_DIR_NAME};
use crate::error::Result;
use crate::file_util;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Exclusion rules supplied on first run.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".pytest_cache",
    "venv",
    ".venv",
    "env",
    ".env",
    ".idea",
    ".vscode",
    ".DS_Store",
    "*.pyc",
    "*.log",
    "*.tmp",
    "*.bak",
    "backup_*",
    "dist",
    "build",
    "*.egg-info",
];

/// The backup configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory tree to snapshot.
    pub source_dir: PathBuf,
    /// Directory holding the archives and the version log.
    pub backup_dir: PathBuf,
    /// Ordered exclusion rules: literal names, substrings, or `*suffix` globs.
    pub auto_exclude: Vec<String>,
    /// Maximum number of backups kept by retention pruning.
    pub max_backups: usize,
    /// Produce zip archives when true, mirrored directories otherwise.
    pub compression: bool,
    /// Advisory only; restore does not consult it.
    pub hash_check: bool,
}

fn working_dir() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_backup_dir_for(working_dir: &Path) -> PathBuf {
    working_dir
        .parent()
        .unwrap_or(working_dir)
        .join(DEFAULT_BACKUP_DIR_NAME)
}

impl Default for Config {
    fn default() -> Self {
        Self::for_working_dir(&working_dir())
    }
}

impl Config {
    /// Default configuration anchored at `working_dir`.
    pub fn for_working_dir(working_dir: &Path) -> Self {
        Self {
            source_dir: working_dir.to_path_buf(),
            backup_dir: default_backup_dir_for(working_dir),
            auto_exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            max_backups: 50,
            compression: true,
            hash_check: true,
        }
    }

    /// Name of the project being backed up: the source directory's last component.
    pub fn project_name(&self) -> String {
        self.source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    }
}

/// The on-disk configuration document.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The configuration document inside `working_dir`.
    pub fn in_dir(working_dir: &Path) -> Self {
        Self::new(working_dir.join(CONFIG_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration, creating the document with defaults if absent.
    ///
    /// A malformed document is reported and replaced in memory by the
    /// defaults; the file itself is left untouched.
    pub fn load_or_create(&self) -> Result<Config> {
        let defaults = Config::for_working_dir(self.dir());
        if !self.path.exists() {
            file_util::write_json_atomic(&self.path, &defaults)?;
            info!(path = %self.path.display(), "created default configuration");
            return Ok(defaults);
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable configuration, using defaults");
                return Ok(defaults);
            }
        };
        match serde_json::from_str::<PartialConfig>(&content) {
            Ok(partial) => Ok(partial.merge_over(defaults)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed configuration, using defaults");
                Ok(defaults)
            }
        }
    }

    /// Writes the whole configuration document.
    pub fn save(&self, config: &Config) -> Result<()> {
        file_util::write_json_atomic(&self.path, config)
    }

    /// Points the configuration at a new source directory and persists it.
    pub fn set_source_dir(&self, config: &Config, source_dir: impl Into<PathBuf>) -> Result<Config> {
        let updated = Config {
            source_dir: source_dir.into(),
            ..config.clone()
        };
        self.save(&updated)?;
        info!(source_dir = %updated.source_dir.display(), "updated source directory");
        Ok(updated)
    }

    /// Points the configuration at a new backup-storage directory, creating
    /// it, and persists the change.
    pub fn set_backup_dir(&self, config: &Config, backup_dir: impl Into<PathBuf>) -> Result<Config> {
        let updated = Config {
            backup_dir: backup_dir.into(),
            ..config.clone()
        };
        fs::create_dir_all(&updated.backup_dir)?;
        self.save(&updated)?;
        info!(backup_dir = %updated.backup_dir.display(), "updated backup directory");
        Ok(updated)
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// A user document where every field may be missing.
///
/// Directory defaults depend on where the configuration file lives, so the
/// merge happens here instead of through serde field defaults.
#[derive(Deserialize, Debug, Default)]
struct PartialConfig {
    source_dir: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    auto_exclude: Option<Vec<String>>,
    max_backups: Option<usize>,
    compression: Option<bool>,
    hash_check: Option<bool>,
}

impl PartialConfig {
    fn merge_over(self, defaults: Config) -> Config {
        Config {
            source_dir: self.source_dir.unwrap_or(defaults.source_dir),
            backup_dir: self.backup_dir.unwrap_or(defaults.backup_dir),
            auto_exclude: self.auto_exclude.unwrap_or(defaults.auto_exclude),
            max_backups: self.max_backups.unwrap_or(defaults.max_backups),
            compression: self.compression.unwrap_or(defaults.compression),
            hash_check: self.hash_check.unwrap_or(defaults.hash_check),
        }
    }
}
