use crate::error::Result;
use filetime::FileTime;
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Serializes `value` as pretty JSON and replaces the document at `path`.
///
/// The document is written to a sibling temporary file first and renamed
/// over the previous copy, so a crash mid-write leaves the old document intact.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_sibling(path);
    let file = File::create(&tmp)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);
    fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Copies `src` to `dest`, creating parent directories as needed and
/// carrying over the modification time.
pub fn copy_preserving_mtime(src: &Path, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = fs::copy(src, dest)?;
    let metadata = fs::metadata(src)?;
    filetime::set_file_mtime(dest, FileTime::from_last_modification_time(&metadata))?;
    Ok(bytes)
}

/// Removes a file, symlink or whole directory tree.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_write_json_atomic_replaces_document() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("doc.json");

        write_json_atomic(&path, &vec!["first"])?;
        write_json_atomic(&path, &vec!["second", "third"])?;

        let parsed: Vec<String> = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(parsed, vec!["second", "third"]);
        assert!(!temp_dir.path().join("nested").join("doc.json.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_copy_preserving_mtime() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let src = temp_dir.path().join("hello.txt");
        fs::write(&src, b"Hello, World!")?;
        let old = SystemTime::now() - Duration::from_secs(3600);
        filetime::set_file_mtime(&src, FileTime::from_system_time(old))?;

        let dest = temp_dir.path().join("out").join("deep").join("hello.txt");
        copy_preserving_mtime(&src, &dest)?;

        assert_eq!(fs::read_to_string(&dest)?, "Hello, World!");
        let src_mtime = FileTime::from_last_modification_time(&fs::metadata(&src)?);
        let dest_mtime = FileTime::from_last_modification_time(&fs::metadata(&dest)?);
        assert_eq!(src_mtime.unix_seconds(), dest_mtime.unix_seconds());
        Ok(())
    }

    #[test]
    fn test_remove_path() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, b"x")?;
        let dir = temp_dir.path().join("dir");
        fs::create_dir_all(dir.join("inner"))?;
        fs::write(dir.join("inner").join("f"), b"y")?;

        remove_path(&file)?;
        remove_path(&dir)?;
        assert!(!file.exists());
        assert!(!dir.exists());
        assert!(remove_path(&file).is_err());
        Ok(())
    }
}
