mod commands;
mod logging;
mod sysexits;

use anyhow::{Context, Result};
use clap::Parser;
use commands::Cli;
use std::{env, process};
use vbackup::BackupError;

/// Entry point for the vbk CLI application.
/// Parses command-line arguments and dispatches to the appropriate command handler.
fn main() -> Result<()> {
    let commands = match Cli::parse().commands {
        Some(commands) => commands,
        None => {
            eprintln!("vbk requires at least one command to execute. See 'vbk --help' for usage.");
            process::exit(sysexits::EX_USAGE);
        }
    };

    logging::init();

    let working_dir = env::current_dir().context("Unable to find current path")?;
    if let Err(e) = commands::dispatch(commands, &working_dir) {
        eprintln!("{e}");
        process::exit(exit_code(&e));
    }
    Ok(())
}

fn exit_code(err: &BackupError) -> i32 {
    match err {
        BackupError::NotFound(_) => sysexits::EX_DATAERR,
        BackupError::MissingArchive(_) | BackupError::MissingSource(_) => sysexits::EX_NOINPUT,
        BackupError::Json(_) => sysexits::EX_CONFIG,
        BackupError::WorkerStopped => sysexits::EX_SOFTWARE,
        _ => sysexits::EX_IOERR,
    }
}
