//! Collected per-item failures of a bulk operation.

use crate::constants::SKIPPED_DISPLAY_LIMIT;
use std::fmt;
use std::io;
use std::path::Path;

/// Items a bulk walk could not process.
///
/// Displaying a `Skipped` lists the first [`SKIPPED_DISPLAY_LIMIT`] items and
/// summarizes the remainder as a count.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Skipped {
    items: Vec<String>,
}

impl Skipped {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: impl Into<String>) {
        self.items.push(item.into());
    }

    /// Records a failed path. Permission failures are listed by path alone,
    /// anything else carries the error text.
    pub fn push_error(&mut self, path: &Path, err: &io::Error) {
        if err.kind() == io::ErrorKind::PermissionDenied {
            self.items.push(path.display().to_string());
        } else {
            self.items.push(format!("{} ({err})", path.display()));
        }
    }

    pub fn push_walk_error(&mut self, err: &walkdir::Error) {
        match err.path() {
            Some(path) => self.items.push(format!("{} ({err})", path.display())),
            None => self.items.push(err.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Number of items left out of the display.
    pub fn overflow(&self) -> usize {
        self.items.len().saturating_sub(SKIPPED_DISPLAY_LIMIT)
    }
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in self.items.iter().take(SKIPPED_DISPLAY_LIMIT) {
            writeln!(f, "  - {item}")?;
        }
        let overflow = self.overflow();
        if overflow > 0 {
            writeln!(f, "  ... and {overflow} more")?;
        }
        Ok(())
    }
}
