// src/install/state.rs

//! Local installation state
//!
//! Installed releases are not recorded anywhere; a release counts as
//! installed when its directory exists and its manifest declares the
//! release tag as version.

use super::manifest::{MANIFEST_FILE, PackageManifest};
use super::release_dir;
use crate::config::InstallConfig;
use crate::error::{Error, Result};
use tracing::debug;

/// Whether release `tag` is already installed under the release folder
///
/// A directory without a readable manifest is reported as
/// `CorruptInstallation` rather than "not installed".
pub fn is_installed(config: &InstallConfig, tag: &str) -> Result<bool> {
    let dir = release_dir(config, tag);
    if !dir.exists() {
        debug!("No release directory at {}", dir.display());
        return Ok(false);
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(Error::CorruptInstallation {
            path: dir,
            reason: format!(
                "folder with the release name was found, but no {} was present in it",
                MANIFEST_FILE
            ),
        });
    }

    let manifest = PackageManifest::load(&manifest_path).map_err(|e| Error::CorruptInstallation {
        path: dir.clone(),
        reason: e.to_string(),
    })?;

    let installed = manifest.version() == Some(tag);
    debug!(
        "{} declares version {:?}, wanted {}",
        manifest_path.display(),
        manifest.version(),
        tag
    );
    Ok(installed)
}
