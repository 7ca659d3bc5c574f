/// Configuration file name, looked up in the working directory.
pub const CONFIG_NAME: &str = "config.json";
/// Version log file name, stored inside the backup-storage directory.
pub const LOG_NAME: &str = "backup_log.json";
/// Extension of compressed backup archives.
pub const ARCHIVE_EXTENSION: &str = "zip";
/// Name of the default backup-storage directory, created next to the working directory.
pub const DEFAULT_BACKUP_DIR_NAME: &str = "project_backups";
/// The tool's own files, never backed up when they sit in the working directory.
pub const TOOL_FILES: &[&str] = &[CONFIG_NAME, "vbk", "vbk.exe"];
/// How many skipped items are printed before the rest is summarized as a count.
pub const SKIPPED_DISPLAY_LIMIT: usize = 10;
/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "VBK_LOG";
