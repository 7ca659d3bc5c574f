//! Archive backends.
//!
//! Both backends walk the source tree the same way, pruning excluded
//! directories and skipping excluded files; they only differ in how the
//! surviving files are written out and read back.

use crate::constants::ARCHIVE_EXTENSION;
use crate::error::Result;
use crate::file_util;
use crate::matcher::ExclusionMatcher;
use crate::report::Skipped;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Files at or above this size need zip64 entry headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// A way of materializing a snapshot on disk.
pub trait ArchiveBackend {
    /// Where an archive called `name` lives inside `backup_dir`.
    fn artifact_path(&self, backup_dir: &Path, name: &str) -> PathBuf;

    /// Writes every non-excluded file under `source` into `dest`.
    ///
    /// Files that cannot be read are skipped and reported; failures of the
    /// archive itself abort the write.
    fn write(&self, source: &Path, matcher: &ExclusionMatcher, dest: &Path) -> Result<Skipped>;

    /// Fails unless `archive` can be opened as this backend's format.
    fn verify(&self, archive: &Path) -> Result<()>;

    /// Repopulates `dest` from `archive`, reporting entries that could not be restored.
    fn restore(&self, archive: &Path, dest: &Path) -> Result<Skipped>;
}

/// Single deflate-compressed zip container.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressedArchive;

/// Plain directory tree mirroring the source layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct MirroredDirectory;

/// Selects the backend matching a record's compression flag.
pub fn backend(compression: bool) -> &'static dyn ArchiveBackend {
    if compression {
        &CompressedArchive
    } else {
        &MirroredDirectory
    }
}

/// Yields `(absolute, relative)` pairs for every included file under `source`.
///
/// Excluded directories are pruned, so nothing below them is visited.
fn included_files<'a>(
    source: &'a Path,
    matcher: &'a ExclusionMatcher,
) -> impl Iterator<Item = walkdir::Result<(PathBuf, PathBuf)>> + 'a {
    WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(move |entry| !matcher.should_exclude(entry.path()))
        .filter_map(move |entry| match entry {
            Ok(entry) => {
                let path = entry.path();
                if !path.is_file() {
                    return None;
                }
                let rel = path.strip_prefix(source).ok()?.to_path_buf();
                Some(Ok((path.to_path_buf(), rel)))
            }
            Err(e) => Some(Err(e)),
        })
}

/// Zip entry name for a relative path, always `/`-separated.
fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl ArchiveBackend for CompressedArchive {
    fn artifact_path(&self, backup_dir: &Path, name: &str) -> PathBuf {
        backup_dir.join(format!("{name}.{ARCHIVE_EXTENSION}"))
    }

    fn write(&self, source: &Path, matcher: &ExclusionMatcher, dest: &Path) -> Result<Skipped> {
        let file = File::create(dest)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let mut skipped = Skipped::new();

        for item in included_files(source, matcher) {
            let (path, rel) = match item {
                Ok(item) => item,
                Err(e) => {
                    skipped.push_walk_error(&e);
                    continue;
                }
            };
            let mut reader = match File::open(&path) {
                Ok(f) => BufReader::new(f),
                Err(e) => {
                    skipped.push_error(&rel, &e);
                    continue;
                }
            };
            let large = reader
                .get_ref()
                .metadata()
                .is_ok_and(|m| m.len() >= ZIP64_THRESHOLD);
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .large_file(large);

            debug!(file = %rel.display(), "adding to archive");
            zip.start_file(entry_name(&rel), options)?;
            if let Err(e) = io::copy(&mut reader, &mut zip) {
                zip.abort_file()?;
                skipped.push_error(&rel, &e);
            }
        }
        zip.finish()?;
        Ok(skipped)
    }

    fn verify(&self, archive: &Path) -> Result<()> {
        ZipArchive::new(BufReader::new(File::open(archive)?))?;
        Ok(())
    }

    fn restore(&self, archive: &Path, dest: &Path) -> Result<Skipped> {
        let file = File::open(archive)?;
        let mut zip = ZipArchive::new(BufReader::new(file))?;
        let mut skipped = Skipped::new();

        for i in 0..zip.len() {
            let mut entry = match zip.by_index(i) {
                Ok(entry) => entry,
                Err(e) => {
                    skipped.push(format!("entry #{i} ({e})"));
                    continue;
                }
            };
            let name = entry.name().to_string();
            let Some(rel) = entry.enclosed_name() else {
                skipped.push(format!("{name} (unsafe path)"));
                continue;
            };
            let out = dest.join(rel);

            let result = if entry.is_dir() {
                fs::create_dir_all(&out)
            } else {
                extract_entry(&mut entry, &out)
            };
            if let Err(e) = result {
                skipped.push_error(Path::new(&name), &e);
            }
        }
        Ok(skipped)
    }
}

fn extract_entry(entry: &mut impl io::Read, out: &Path) -> io::Result<()> {
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(out)?);
    io::copy(entry, &mut writer)?;
    Ok(())
}

impl ArchiveBackend for MirroredDirectory {
    fn artifact_path(&self, backup_dir: &Path, name: &str) -> PathBuf {
        backup_dir.join(name)
    }

    fn write(&self, source: &Path, matcher: &ExclusionMatcher, dest: &Path) -> Result<Skipped> {
        fs::create_dir_all(dest)?;
        let mut skipped = Skipped::new();

        for item in included_files(source, matcher) {
            match item {
                Ok((path, rel)) => {
                    debug!(file = %rel.display(), "mirroring");
                    if let Err(e) = file_util::copy_preserving_mtime(&path, &dest.join(&rel)) {
                        skipped.push_error(&rel, &e);
                    }
                }
                Err(e) => skipped.push_walk_error(&e),
            }
        }
        Ok(skipped)
    }

    fn verify(&self, archive: &Path) -> Result<()> {
        if fs::metadata(archive)?.is_dir() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a mirrored backup", archive.display()),
            )
            .into())
        }
    }

    fn restore(&self, archive: &Path, dest: &Path) -> Result<Skipped> {
        let mut skipped = Skipped::new();

        for entry in WalkDir::new(archive).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    skipped.push_walk_error(&e);
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(archive) else {
                continue;
            };
            if let Err(e) = file_util::copy_preserving_mtime(entry.path(), &dest.join(rel)) {
                skipped.push_error(rel, &e);
            }
        }
        Ok(skipped)
    }
}
