// src/install/finalize.rs

//! Post-extraction steps: manifest patch and pruning of old releases

use super::manifest::PackageManifest;
use crate::error::{Error, Result};
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Dependency whose declaration breaks dependency installation of some releases
pub const PROBLEMATIC_DEPENDENCY: &str = "bunyan";

/// First 1.1.x patch release that no longer needs the manifest patch
const FIRST_FIXED_PATCH: u64 = 13;

/// Remove the problematic dependency declaration from the manifest at
/// `manifest_path`
///
/// Returns whether a declaration was removed. The file is only rewritten
/// when it changed.
pub fn patch_manifest(tag: &str, manifest_path: &Path) -> Result<bool> {
    if !manifest_path.exists() {
        return Err(Error::ManifestNotFound(manifest_path.to_path_buf()));
    }

    let mut manifest = PackageManifest::load(manifest_path)?;
    let removed = match manifest.remove_dependency(PROBLEMATIC_DEPENDENCY) {
        Some(section) => {
            manifest.save(manifest_path)?;
            info!(
                "Removed {} from {} in {}",
                PROBLEMATIC_DEPENDENCY,
                section,
                manifest_path.display()
            );
            true
        }
        None => false,
    };

    if is_known_buggy_release(tag) {
        warn!(
            "Patching package.json bug in versions before 1.1.{}... removing {} dependency",
            FIRST_FIXED_PATCH, PROBLEMATIC_DEPENDENCY
        );
    }

    Ok(removed)
}

/// Whether `tag` is a 1.1.x release older than 1.1.13
fn is_known_buggy_release(tag: &str) -> bool {
    let trimmed = tag.trim().trim_start_matches('v');
    match Version::parse(trimmed) {
        Ok(version) => version.major == 1 && version.minor == 1 && version.patch < FIRST_FIXED_PATCH,
        Err(_) => false,
    }
}

/// Remove every release directory under `release_folder` whose name does
/// not contain `keep_tag`
///
/// Only directories are considered; files such as the lock file or
/// downloaded archives are left alone. Returns the removed paths.
pub fn prune_other_versions(release_folder: &Path, keep_tag: &str) -> Result<Vec<PathBuf>> {
    super::validate_tag(keep_tag)?;
    let mut targets = Vec::new();
    for entry in fs::read_dir(release_folder).map_err(|e| {
        Error::IoError(format!("Failed to list {}: {}", release_folder.display(), e))
    })? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().contains(keep_tag) {
            continue;
        }
        targets.push(entry.path());
    }
    targets.sort();

    info!("Found {} releases which will be removed", targets.len());
    for dir in &targets {
        warn!("Deleting other release in {}", dir.display());
        fs::remove_dir_all(dir).map_err(|e| {
            Error::IoError(format!("Failed to remove {}: {}", dir.display(), e))
        })?;
    }

    Ok(targets)
}
