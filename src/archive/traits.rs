// src/archive/traits.rs

//! Common types for archive readers

use crate::error::Result;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Kind of filesystem object an archive entry produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

/// An entry written to disk during extraction, in archive order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    /// Path relative to the extraction root
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl ExtractedEntry {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// First path component, i.e. the top-level folder the entry lives in
    pub fn top_level(&self) -> Option<&OsStr> {
        self.path.iter().next()
    }
}

/// Common interface for the supported archive formats
pub trait ArchiveFormat {
    /// Open the archive at `path`
    fn open(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Short format name for log messages
    fn format_name(&self) -> &'static str;

    /// Unpack every entry below `target_root`
    ///
    /// Entries that would land outside `target_root` are skipped and not
    /// returned.
    fn extract_to(&mut self, target_root: &Path) -> Result<Vec<ExtractedEntry>>;
}
