//! Command-line interface definition for vbackup.
//!
//! Each subcommand maps onto one engine operation; this module only parses
//! arguments and renders results.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use vbackup::config::{Config, ConfigFile};
use vbackup::engine::{Engine, PruneReport};
use vbackup::path_util;
use vbackup::report::Skipped;
use vbackup::{BackupError, BackupRecord, Result};

/// Command-line interface definition for vbackup.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub commands: Option<Commands>,
}

/// Supported vbk commands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Snapshot the source directory into a new backup.
    Create {
        /// Free-text comment, appended to the backup name.
        #[arg(short = 'm', long)]
        comment: Option<String>,
        /// Apply the retention limit after creating the backup.
        #[arg(short, long)]
        prune: bool,
    },
    /// List existing backups, newest first.
    List,
    /// Show the details of one backup.
    Info {
        /// Version identifier, e.g. v003_20250101_120000.
        id: String,
    },
    /// Replace the source directory's contents with a backup.
    Restore {
        /// Version identifier to restore.
        id: String,
    },
    /// Delete a backup from disk and from the version log.
    Delete {
        /// Version identifier to delete.
        id: String,
    },
    /// Delete the oldest backups beyond the configured maximum.
    Prune,
    /// Display the configuration, or change the source/backup directories.
    Config {
        /// New source directory.
        #[arg(short, long)]
        source: Option<PathBuf>,
        /// New backup-storage directory.
        #[arg(short, long)]
        backup: Option<PathBuf>,
    },
}

/// Runs one command from `working_dir`.
pub(crate) fn dispatch(command: Commands, working_dir: &Path) -> Result<()> {
    let config_file = ConfigFile::in_dir(working_dir);
    let config = config_file.load_or_create()?;

    let open = |config: Config| Engine::new(config, working_dir);
    match command {
        Commands::Create { comment, prune } => {
            let mut engine = open(config)?;
            create(&mut engine, comment.as_deref().unwrap_or(""))?;
            if prune {
                prune_cmd(&mut engine)?;
            }
        }
        Commands::List => list(&mut open(config)?)?,
        Commands::Info { id } => info(&open(config)?, &id)?,
        Commands::Restore { id } => restore(&mut open(config)?, &id)?,
        Commands::Delete { id } => {
            open(config)?.delete(&id)?;
            println!("Deleted version {id}.");
        }
        Commands::Prune => prune_cmd(&mut open(config)?)?,
        Commands::Config { source, backup } => {
            config_cmd(&config_file, config, source, backup, working_dir)?
        }
    }
    Ok(())
}

fn create(engine: &mut Engine, comment: &str) -> Result<()> {
    let outcome = engine.create(comment)?;
    println!("Backup created: {}", outcome.record.id);
    println!("Location: {}", outcome.record.path.display());
    print_skipped("file(s) could not be backed up", &outcome.skipped);
    Ok(())
}

fn list(engine: &mut Engine) -> Result<()> {
    let backups = engine.list()?;
    if backups.is_empty() {
        println!("No backups found.");
        return Ok(());
    }
    for backup in &backups {
        println!("{}", display_record_line(backup));
    }
    Ok(())
}

fn display_record_line(record: &BackupRecord) -> String {
    format!(
        "{} - {} - {}",
        record.id,
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.comment
    )
}

fn info(engine: &Engine, id: &str) -> Result<()> {
    let record = engine
        .find(id)
        .ok_or_else(|| BackupError::NotFound(id.to_string()))?;
    println!("id: {}", record.id);
    println!("name: {}", record.name);
    println!("created: {}", record.timestamp.format("%Y-%m-%d %H:%M:%S"));
    println!("path: {}", record.path.display());
    println!("format: {}", if record.compression { "zip" } else { "directory" });
    if !record.comment.is_empty() {
        println!("comment: {}", record.comment);
    }
    if !record.exists() {
        println!("warning: the archive is missing from disk");
    }
    Ok(())
}

fn restore(engine: &mut Engine, id: &str) -> Result<()> {
    let report = engine.restore(id)?;
    println!("Restored version {id}.");
    print_skipped("item(s) could not be deleted", &report.not_deleted);
    print_skipped("file(s) could not be restored", &report.not_restored);
    Ok(())
}

fn prune_cmd(engine: &mut Engine) -> Result<()> {
    let PruneReport { deleted, failed } = engine.prune()?;
    if deleted.is_empty() && failed.is_empty() {
        println!(
            "Nothing to prune (limit is {} backups).",
            engine.config().max_backups
        );
    }
    for id in &deleted {
        println!("Deleted version {id}.");
    }
    for (id, e) in &failed {
        eprintln!("Failed to delete version {id}: {e}");
    }
    Ok(())
}

fn config_cmd(
    config_file: &ConfigFile,
    mut config: Config,
    source: Option<PathBuf>,
    backup: Option<PathBuf>,
    working_dir: &Path,
) -> Result<()> {
    if let Some(source) = source {
        let source = path_util::expand_path(&source, working_dir);
        path_util::check_path(&source)?;
        config = config_file.set_source_dir(&config, source)?;
    }
    if let Some(backup) = backup {
        let backup = path_util::expand_path(&backup, working_dir);
        config = config_file.set_backup_dir(&config, backup)?;
    }
    println!("config file: {}", config_file.path().display());
    println!("source_dir: {}", config.source_dir.display());
    println!("backup_dir: {}", config.backup_dir.display());
    println!("max_backups: {}", config.max_backups);
    println!("compression: {}", config.compression);
    Ok(())
}

fn print_skipped(what: &str, skipped: &Skipped) {
    if !skipped.is_empty() {
        println!("Warning: {} {what}:", skipped.len());
        print!("{skipped}");
    }
}
