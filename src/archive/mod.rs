// src/archive/mod.rs

//! Release archive extraction
//!
//! Release artifacts come in two shapes: packaged assets (zip) and source
//! snapshots (gzip-compressed tarballs). The downloaded file is always named
//! `.zip`, so the format is detected from its leading magic bytes.

pub mod tarball;
pub mod traits;
pub mod zipfile;

pub use tarball::TarballArchive;
pub use traits::{ArchiveFormat, EntryKind, ExtractedEntry};
pub use zipfile::ZipReleaseArchive;

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Archive container types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormatType {
    Zip,
    TarGz,
}

/// Detect the archive format from its magic bytes
pub fn detect_archive_format(path: &Path) -> Result<ArchiveFormatType> {
    let mut file = File::open(path).map_err(|e| {
        Error::IoError(format!("Failed to open archive {}: {}", path.display(), e))
    })?;
    let mut magic = [0u8; 4];
    let read = file.read(&mut magic)?;

    // Zip local file header "PK\x03\x04", or "PK\x05\x06" for an empty archive
    if read >= 4 && magic[0..2] == *b"PK" && (magic[2..4] == [0x03, 0x04] || magic[2..4] == [0x05, 0x06])
    {
        return Ok(ArchiveFormatType::Zip);
    }

    // Gzip magic: 0x1F 0x8B
    if read >= 2 && magic[0..2] == [0x1F, 0x8B] {
        return Ok(ArchiveFormatType::TarGz);
    }

    Err(Error::UnexpectedArchiveLayout(format!(
        "Unable to detect archive format of {}",
        path.display()
    )))
}

/// Extract `archive_path` below `target_root`, returning the entries written
/// in archive order
pub fn extract(archive_path: &Path, target_root: &Path) -> Result<Vec<ExtractedEntry>> {
    let format = detect_archive_format(archive_path)?;
    debug!("Detected archive format {:?} for {}", format, archive_path.display());

    std::fs::create_dir_all(target_root).map_err(|e| {
        Error::IoError(format!(
            "Failed to create directory {}: {}",
            target_root.display(),
            e
        ))
    })?;

    let entries = match format {
        ArchiveFormatType::Zip => extract_with(ZipReleaseArchive::open(archive_path)?, target_root)?,
        ArchiveFormatType::TarGz => extract_with(TarballArchive::open(archive_path)?, target_root)?,
    };

    info!(
        "Extracted {} entries from {} into {}",
        entries.len(),
        archive_path.display(),
        target_root.display()
    );
    Ok(entries)
}

fn extract_with<A: ArchiveFormat>(mut archive: A, target_root: &Path) -> Result<Vec<ExtractedEntry>> {
    debug!(
        "Extracting {} archive into {}",
        archive.format_name(),
        target_root.display()
    );
    archive.extract_to(target_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_source_tarball, write_zip};
    use tempfile::tempdir;

    #[test]
    fn test_detect_zip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a-download.zip");
        write_zip(&path, &[("package.json", Some("{}"))]);

        assert_eq!(detect_archive_format(&path).unwrap(), ArchiveFormatType::Zip);
    }

    #[test]
    fn test_detect_tarball_despite_zip_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a-download.zip");
        write_source_tarball(&path, &[("root/", None), ("root/package.json", Some("{}"))]);

        assert_eq!(detect_archive_format(&path).unwrap(), ArchiveFormatType::TarGz);
    }

    #[test]
    fn test_detect_unknown() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.zip");
        std::fs::write(&path, [0xFF, 0xFF, 0xFF, 0xFF]).unwrap();

        assert!(matches!(
            detect_archive_format(&path),
            Err(Error::UnexpectedArchiveLayout(_))
        ));
    }

    #[test]
    fn test_detect_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.zip");
        std::fs::write(&path, [0x1F]).unwrap();

        assert!(detect_archive_format(&path).is_err());
    }

    #[test]
    fn test_extract_dispatches_on_format() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("asset.zip");
        write_zip(&zip_path, &[("dist/", None), ("dist/index.js", Some("x"))]);

        let target = dir.path().join("out");
        let entries = extract(&zip_path, &target).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(target.join("dist/index.js").is_file());
    }
}
