// src/install/mod.rs

//! Release installation
//!
//! Layout of the release folder and the extract-and-normalize step:
//! - `<product>-<tag>/` holds one installed release
//! - `<product>-<tag>-download.zip` is the transient downloaded artifact
//!
//! Packaged assets are extracted straight into the release directory.
//! Source snapshots contain a single top-level folder that is extracted into
//! the release folder and then renamed to the release directory name.

pub mod finalize;
pub mod manifest;
pub mod state;

pub use finalize::{patch_manifest, prune_other_versions};
pub use manifest::{MANIFEST_FILE, PackageManifest};
pub use state::is_installed;

use crate::archive::{self, ExtractedEntry};
use crate::config::InstallConfig;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Check that `tag` can be used as a path component
///
/// Tags come from the remote feed and end up in directory and file names, so
/// anything that could leave the release folder is rejected.
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.trim().is_empty() || tag == "." || tag == ".." || tag.contains(['/', '\\']) {
        return Err(Error::InvalidReleaseTag(tag.to_string()));
    }
    Ok(())
}

/// Directory name of an installed release
pub fn release_dir_name(product: &str, tag: &str) -> String {
    format!("{}-{}", product, tag)
}

/// File name of a downloaded release artifact
pub fn artifact_file_name(product: &str, tag: &str) -> String {
    format!("{}-{}-download.zip", product, tag)
}

/// Canonical directory of release `tag`
pub fn release_dir(config: &InstallConfig, tag: &str) -> PathBuf {
    config
        .release_folder
        .join(release_dir_name(&config.product_name, tag))
}

/// Make sure nothing occupies the release directory before extraction
///
/// An existing directory is removed when overwriting is enabled, otherwise
/// the install fails without touching it.
pub fn ensure_target_available(config: &InstallConfig, target: &Path) -> Result<()> {
    if !target.exists() {
        return Ok(());
    }

    if config.overwrite_existing {
        warn!("Removing existing release folder {}", target.display());
        fs::remove_dir_all(target).map_err(|e| {
            Error::IoError(format!("Failed to remove {}: {}", target.display(), e))
        })?;
        Ok(())
    } else {
        Err(Error::TargetAlreadyExists(target.to_path_buf()))
    }
}

/// Bring extracted files into the canonical release directory
///
/// `packaged` artifacts are already in place. Source snapshots must start
/// with their top-level folder, which is renamed to the release directory.
pub fn normalize(
    config: &InstallConfig,
    extracted: &[ExtractedEntry],
    tag: &str,
    packaged: bool,
) -> Result<PathBuf> {
    let target = release_dir(config, tag);
    if packaged {
        return Ok(target);
    }

    let first = extracted.first().ok_or_else(|| {
        Error::UnexpectedArchiveLayout("The source archive contained no entries".to_string())
    })?;
    if !first.is_dir() {
        return Err(Error::UnexpectedArchiveLayout(format!(
            "Expected the first archive entry to be a folder, found {}",
            first.path.display()
        )));
    }
    let top_level = first.top_level().ok_or_else(|| {
        Error::UnexpectedArchiveLayout("The first archive entry has an empty path".to_string())
    })?;

    let extracted_root = config.release_folder.join(top_level);
    if extracted_root == target {
        return Ok(target);
    }

    info!(
        "Renaming {} to {}",
        extracted_root.display(),
        target.display()
    );
    fs::rename(&extracted_root, &target).map_err(|e| {
        Error::IoError(format!(
            "Failed to move {} to {}: {}",
            extracted_root.display(),
            target.display(),
            e
        ))
    })?;
    Ok(target)
}

/// Extract the artifact at `archive_path` as release `tag` and return the
/// release directory
pub fn install_archive(
    config: &InstallConfig,
    archive_path: &Path,
    tag: &str,
    packaged: bool,
) -> Result<PathBuf> {
    validate_tag(tag)?;
    let target = release_dir(config, tag);
    ensure_target_available(config, &target)?;

    info!("Safe to continue, decompressing release {}", tag);
    let extraction_root = if packaged {
        target.clone()
    } else {
        config.release_folder.clone()
    };
    let extracted = archive::extract(archive_path, &extraction_root)?;

    normalize(config, &extracted, tag, packaged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::EntryKind;
    use crate::test_support::{write_source_tarball, write_zip};
    use tempfile::tempdir;

    fn config_in(root: &Path) -> InstallConfig {
        let mut config = InstallConfig::new(root);
        config.product_name = "app".to_string();
        config
    }

    #[test]
    fn test_layout_names() {
        assert_eq!(release_dir_name("app", "1.2.0"), "app-1.2.0");
        assert_eq!(artifact_file_name("app", "1.2.0"), "app-1.2.0-download.zip");

        let config = config_in(Path::new("/srv/releases"));
        assert_eq!(
            release_dir(&config, "1.2.0"),
            PathBuf::from("/srv/releases/app-1.2.0")
        );
    }

    #[test]
    fn test_validate_tag() {
        assert!(validate_tag("1.2.0").is_ok());
        assert!(validate_tag("v1.2.0-rc.1").is_ok());
        for bad in ["", "  ", ".", "..", "x/../../victim", "release\\1.2.0"] {
            assert!(
                matches!(validate_tag(bad), Err(Error::InvalidReleaseTag(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_install_rejects_traversing_tag() {
        let dir = tempdir().unwrap();
        let releases = dir.path().join("releases");
        let victim = dir.path().join("victim");
        fs::create_dir_all(&releases).unwrap();
        fs::create_dir_all(&victim).unwrap();
        let mut config = config_in(&releases);
        config.overwrite_existing = true;
        let archive = releases.join("download.zip");
        write_zip(&archive, &[("package.json", Some(r#"{"version":"1.2.0"}"#))]);

        let result = install_archive(&config, &archive, "x/../../victim", true);
        assert!(matches!(result, Err(Error::InvalidReleaseTag(_))));
        assert!(victim.is_dir());
    }

    #[test]
    fn test_packaged_asset_installs_flat() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let archive = dir.path().join("app-1.2.0-download.zip");
        write_zip(
            &archive,
            &[
                ("package.json", Some(r#"{"version":"1.2.0"}"#)),
                ("server/", None),
            ],
        );

        let installed = install_archive(&config, &archive, "1.2.0", true).unwrap();
        assert_eq!(installed, dir.path().join("app-1.2.0"));
        assert!(installed.join(MANIFEST_FILE).is_file());
        assert!(is_installed(&config, "1.2.0").unwrap());
    }

    #[test]
    fn test_source_snapshot_is_renamed() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let archive = dir.path().join("app-1.2.0-download.zip");
        write_source_tarball(
            &archive,
            &[
                ("acme-app-0f3c2a1/", None),
                ("acme-app-0f3c2a1/package.json", Some(r#"{"version":"1.2.0"}"#)),
            ],
        );

        let installed = install_archive(&config, &archive, "1.2.0", false).unwrap();
        assert_eq!(installed, dir.path().join("app-1.2.0"));
        assert!(!dir.path().join("acme-app-0f3c2a1").exists());
        assert!(is_installed(&config, "1.2.0").unwrap());
    }

    #[test]
    fn test_source_snapshot_with_leading_file_rejected() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let archive = dir.path().join("app-1.2.0-download.zip");
        write_source_tarball(
            &archive,
            &[
                ("README.md", Some("readme")),
                ("acme-app-0f3c2a1/", None),
            ],
        );

        let result = install_archive(&config, &archive, "1.2.0", false);
        assert!(matches!(result, Err(Error::UnexpectedArchiveLayout(_))));
        assert!(dir.path().join("acme-app-0f3c2a1").is_dir());
        assert!(!dir.path().join("app-1.2.0").exists());
    }

    #[test]
    fn test_normalize_empty_source_archive() {
        let dir = tempdir().unwrap();
        let result = normalize(&config_in(dir.path()), &[], "1.2.0", false);
        assert!(matches!(result, Err(Error::UnexpectedArchiveLayout(_))));
    }

    #[test]
    fn test_normalize_already_named_root() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(dir.path().join("app-1.2.0")).unwrap();

        let entries = vec![ExtractedEntry::new("app-1.2.0", EntryKind::Directory)];
        let target = normalize(&config, &entries, "1.2.0", false).unwrap();
        assert_eq!(target, dir.path().join("app-1.2.0"));
    }

    #[test]
    fn test_existing_target_without_overwrite() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let target = dir.path().join("app-1.2.0");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("keep.txt"), "old").unwrap();

        let result = ensure_target_available(&config, &target);
        assert!(matches!(result, Err(Error::TargetAlreadyExists(_))));
        assert!(target.join("keep.txt").is_file());
    }

    #[test]
    fn test_existing_target_with_overwrite() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.overwrite_existing = true;
        let target = dir.path().join("app-1.2.0");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.txt"), "old").unwrap();

        let archive = dir.path().join("app-1.2.0-download.zip");
        write_zip(&archive, &[("package.json", Some(r#"{"version":"1.2.0"}"#))]);

        install_archive(&config, &archive, "1.2.0", true).unwrap();
        assert!(!target.join("stale.txt").exists());
        assert!(target.join(MANIFEST_FILE).is_file());
    }
}
