// src/archive/zipfile.rs

//! Zip archives, the format of packaged release assets

use super::traits::{ArchiveFormat, EntryKind, ExtractedEntry};
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path};
use tracing::{debug, warn};
use zip::ZipArchive;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// A zip release archive opened for extraction
pub struct ZipReleaseArchive {
    archive: ZipArchive<File>,
}

impl ArchiveFormat for ZipReleaseArchive {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::IoError(format!("Failed to open archive {}: {}", path.display(), e))
        })?;
        let archive = ZipArchive::new(file).map_err(|e| {
            Error::UnexpectedArchiveLayout(format!(
                "Failed to read zip archive {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { archive })
    }

    fn format_name(&self) -> &'static str {
        "zip"
    }

    fn extract_to(&mut self, target_root: &Path) -> Result<Vec<ExtractedEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());

        for index in 0..self.archive.len() {
            let mut file = self.archive.by_index(index).map_err(|e| {
                Error::UnexpectedArchiveLayout(format!("Failed to read zip entry {}: {}", index, e))
            })?;

            let Some(relative) = file.enclosed_name() else {
                warn!("Skipping zip entry with unsafe path: {}", file.name());
                continue;
            };
            if crosses_symlink(target_root, &relative) {
                warn!("Skipping zip entry below a symlink: {}", file.name());
                continue;
            }
            let out_path = target_root.join(&relative);

            if file.is_dir() {
                fs::create_dir_all(&out_path).map_err(|e| {
                    Error::IoError(format!("Failed to create {}: {}", out_path.display(), e))
                })?;
                entries.push(ExtractedEntry::new(relative, EntryKind::Directory));
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::IoError(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }

            let mode = file.unix_mode();
            if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
                let mut target = String::new();
                io::Read::read_to_string(&mut file, &mut target)?;
                if symlink_escapes(&relative, &target) {
                    warn!(
                        "Skipping symlink {} pointing outside the archive: {}",
                        relative.display(),
                        target
                    );
                    continue;
                }
                write_symlink(&target, &out_path)?;
                entries.push(ExtractedEntry::new(relative, EntryKind::Symlink));
                continue;
            }

            let mut out = File::create(&out_path).map_err(|e| {
                Error::IoError(format!("Failed to create {}: {}", out_path.display(), e))
            })?;
            io::copy(&mut file, &mut out).map_err(|e| {
                Error::UnexpectedArchiveLayout(format!(
                    "Failed to extract {}: {}",
                    relative.display(),
                    e
                ))
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = mode {
                    fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o7777))?;
                }
            }

            entries.push(ExtractedEntry::new(relative, EntryKind::File));
        }

        debug!("Extracted {} zip entries", entries.len());
        Ok(entries)
    }
}

/// Whether an existing symlink sits between `root` and the entry at `relative`
fn crosses_symlink(root: &Path, relative: &Path) -> bool {
    let mut current = root.to_path_buf();
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        current.push(component);
        if current
            .symlink_metadata()
            .is_ok_and(|meta| meta.file_type().is_symlink())
        {
            return true;
        }
    }
    false
}

/// Whether a symlink at `relative` with link text `target` resolves outside
/// the extraction root
fn symlink_escapes(relative: &Path, target: &str) -> bool {
    let target = Path::new(target);
    if target.has_root() {
        return true;
    }

    let mut depth = relative.components().count() as i64 - 1;
    for component in target.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return true,
        }
    }
    false
}

#[cfg(unix)]
fn write_symlink(target: &str, link: &Path) -> Result<()> {
    if link.symlink_metadata().is_ok() {
        fs::remove_file(link)?;
    }
    std::os::unix::fs::symlink(target, link)
        .map_err(|e| Error::IoError(format!("Failed to create symlink {}: {}", link.display(), e)))
}

#[cfg(not(unix))]
fn write_symlink(target: &str, link: &Path) -> Result<()> {
    warn!("Writing symlink {} as a regular file", link.display());
    fs::write(link, target)?;
    Ok(())
}
