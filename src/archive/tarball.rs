// src/archive/tarball.rs

//! Gzip-compressed tarballs, the format of source snapshots

use super::traits::{ArchiveFormat, EntryKind, ExtractedEntry};
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use tar::{Archive, EntryType};
use tracing::{debug, warn};

/// A source snapshot tarball opened for extraction
pub struct TarballArchive {
    archive: Archive<GzDecoder<File>>,
}

impl TarballArchive {
    /// Metadata records that carry no file of their own
    fn is_metadata_entry(entry_type: EntryType) -> bool {
        entry_type.is_pax_global_extensions()
            || entry_type.is_pax_local_extensions()
            || entry_type.is_gnu_longname()
            || entry_type.is_gnu_longlink()
    }
}

impl ArchiveFormat for TarballArchive {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::IoError(format!("Failed to open archive {}: {}", path.display(), e))
        })?;
        Ok(Self {
            archive: Archive::new(GzDecoder::new(file)),
        })
    }

    fn format_name(&self) -> &'static str {
        "tar.gz"
    }

    fn extract_to(&mut self, target_root: &Path) -> Result<Vec<ExtractedEntry>> {
        let mut entries = Vec::new();

        let archive_entries = self.archive.entries().map_err(|e| {
            Error::UnexpectedArchiveLayout(format!("Failed to read archive entries: {}", e))
        })?;

        for entry in archive_entries {
            let mut entry = entry.map_err(|e| {
                Error::UnexpectedArchiveLayout(format!("Failed to read archive entry: {}", e))
            })?;

            let entry_type = entry.header().entry_type();
            if Self::is_metadata_entry(entry_type) {
                continue;
            }

            let relative = entry
                .path()
                .map_err(|e| {
                    Error::UnexpectedArchiveLayout(format!("Failed to get entry path: {}", e))
                })?
                .into_owned();

            let kind = if entry_type.is_dir() {
                EntryKind::Directory
            } else if entry_type.is_symlink() {
                EntryKind::Symlink
            } else {
                EntryKind::File
            };

            let unpacked = entry.unpack_in(target_root).map_err(|e| {
                Error::UnexpectedArchiveLayout(format!(
                    "Failed to extract {}: {}",
                    relative.display(),
                    e
                ))
            })?;
            if !unpacked {
                warn!("Skipping tar entry with unsafe path: {}", relative.display());
                continue;
            }

            entries.push(ExtractedEntry::new(relative, kind));
        }

        debug!("Extracted {} tarball entries", entries.len());
        Ok(entries)
    }
}
