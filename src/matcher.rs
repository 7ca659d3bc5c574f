//! Decides which paths take part in a backup.

use crate::constants::TOOL_FILES;
use std::path::{Path, PathBuf};

/// Exclusion rules applied to every entry of a source tree walk.
///
/// Rules are checked in order and the first match wins:
/// 1. the backup-storage directory and anything under it;
/// 2. the tool's own files, when they sit directly in the working directory;
/// 3. each configured rule, as a `*suffix` glob, an exact final component,
///    or a substring of the full path.
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    backup_dir: PathBuf,
    working_dir: PathBuf,
    rules: Vec<String>,
}

impl ExclusionMatcher {
    pub fn new(
        backup_dir: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
        rules: Vec<String>,
    ) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            working_dir: working_dir.into(),
            rules,
        }
    }

    pub fn should_exclude(&self, path: &Path) -> bool {
        self.is_structural(path) || self.matches_rule(path)
    }

    /// True for the exclusions that hold regardless of the configured rules.
    pub fn is_structural(&self, path: &Path) -> bool {
        if path.starts_with(&self.backup_dir) {
            return true;
        }
        let in_working_dir = path.parent() == Some(self.working_dir.as_path());
        in_working_dir
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| TOOL_FILES.contains(&name))
    }

    fn matches_rule(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        let name = path.file_name().map(|n| n.to_string_lossy());
        self.rules.iter().any(|rule| {
            if let Some(suffix) = rule.strip_prefix('*') {
                path_str.ends_with(suffix)
            } else {
                name.as_deref() == Some(rule.as_str()) || path_str.contains(rule.as_str())
            }
        })
    }
}
