// src/config.rs

//! Installer configuration
//!
//! Configuration is read once at startup from a JSON file, merged with
//! command-line overrides and validated into an immutable [`InstallConfig`]
//! that every component receives by reference.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "octofarm-installer.config.json";

const DEFAULT_GITHUB_ORG: &str = "octofarm";
const DEFAULT_GITHUB_REPO: &str = "octofarm";
const DEFAULT_PRODUCT_NAME: &str = "octofarm";
const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
const DEFAULT_PACKAGE_MANAGER: &str = "npm";
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// Raw configuration as it appears on disk
///
/// Every field is optional so that the same shape can carry command-line
/// overrides. Unknown keys are rejected.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub release_folder: Option<String>,
    pub decompress_overwrite: Option<bool>,
    pub cleanup_downloaded_archive: Option<bool>,
    pub clean_old_versions: Option<bool>,
    pub skip_pm2_checks: Option<bool>,
    pub prereleases_allowed: Option<bool>,
    pub github_org: Option<String>,
    pub github_repo: Option<String>,
    pub product_name: Option<String>,
    pub api_base_url: Option<String>,
    pub download_timeout_secs: Option<u64>,
    pub package_manager: Option<String>,
}

impl ConfigFile {
    /// Parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Load the configuration file, tolerating a missing file
    ///
    /// When `required` is false and the file does not exist, an empty
    /// configuration is returned so that defaults and overrides apply.
    pub fn load_or_default(path: &Path, required: bool) -> Result<Self> {
        if !required && !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Layer `overrides` on top of this configuration; set values in
    /// `overrides` win.
    pub fn merge(self, overrides: ConfigFile) -> Self {
        Self {
            release_folder: overrides.release_folder.or(self.release_folder),
            decompress_overwrite: overrides.decompress_overwrite.or(self.decompress_overwrite),
            cleanup_downloaded_archive: overrides
                .cleanup_downloaded_archive
                .or(self.cleanup_downloaded_archive),
            clean_old_versions: overrides.clean_old_versions.or(self.clean_old_versions),
            skip_pm2_checks: overrides.skip_pm2_checks.or(self.skip_pm2_checks),
            prereleases_allowed: overrides.prereleases_allowed.or(self.prereleases_allowed),
            github_org: overrides.github_org.or(self.github_org),
            github_repo: overrides.github_repo.or(self.github_repo),
            product_name: overrides.product_name.or(self.product_name),
            api_base_url: overrides.api_base_url.or(self.api_base_url),
            download_timeout_secs: overrides.download_timeout_secs.or(self.download_timeout_secs),
            package_manager: overrides.package_manager.or(self.package_manager),
        }
    }
}

/// Validated, immutable installer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    /// Root directory holding one subdirectory per installed release
    pub release_folder: PathBuf,
    /// Delete an existing release directory with the same tag before installing
    pub overwrite_existing: bool,
    /// Remove the downloaded archive once it has been extracted
    pub cleanup_archive_after_install: bool,
    /// Remove all other release directories after a successful install
    pub prune_other_versions: bool,
    /// Skip the process supervisor check/install
    pub skip_supervisor_checks: bool,
    /// Consider prereleases when picking the latest release
    pub allow_prereleases: bool,
    pub repository_org: String,
    pub repository_name: String,
    /// Prefix of release directory and archive names
    pub product_name: String,
    pub api_base_url: String,
    pub download_timeout: Duration,
    /// Executable used for dependency installation
    pub package_manager: String,
}

impl InstallConfig {
    /// Build a configuration rooted at `release_folder` with every other
    /// option at its default.
    pub fn new(release_folder: impl Into<PathBuf>) -> Self {
        Self {
            release_folder: release_folder.into(),
            overwrite_existing: false,
            cleanup_archive_after_install: false,
            prune_other_versions: false,
            skip_supervisor_checks: false,
            allow_prereleases: false,
            repository_org: DEFAULT_GITHUB_ORG.to_string(),
            repository_name: DEFAULT_GITHUB_REPO.to_string(),
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            package_manager: DEFAULT_PACKAGE_MANAGER.to_string(),
        }
    }

    /// `org/repo` path fragment of the release feed
    pub fn repository(&self) -> String {
        format!("{}/{}", self.repository_org, self.repository_name)
    }

    /// Check the invariants every component relies on
    pub fn validate(&self) -> Result<()> {
        if self.release_folder.as_os_str().is_empty() {
            return Err(Error::ConfigError(
                "The 'release_folder' needs to be defined in order to install".to_string(),
            ));
        }
        if self.repository_org.trim().is_empty() || self.repository_name.trim().is_empty() {
            return Err(Error::ConfigError(
                "Both 'github_org' and 'github_repo' must be non-empty".to_string(),
            ));
        }
        if self.product_name.is_empty()
            || self.product_name.contains(['/', '\\'])
            || self.product_name == "."
            || self.product_name == ".."
        {
            return Err(Error::ConfigError(format!(
                "Invalid 'product_name': {:?}",
                self.product_name
            )));
        }
        if self.package_manager.trim().is_empty() {
            return Err(Error::ConfigError(
                "'package_manager' must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl TryFrom<ConfigFile> for InstallConfig {
    type Error = Error;

    fn try_from(file: ConfigFile) -> Result<Self> {
        let release_folder = file.release_folder.ok_or_else(|| {
            Error::ConfigError(
                "The 'release_folder' needs to be defined in order to install".to_string(),
            )
        })?;

        let mut config = InstallConfig::new(release_folder);
        config.overwrite_existing = file.decompress_overwrite.unwrap_or(false);
        config.cleanup_archive_after_install = file.cleanup_downloaded_archive.unwrap_or(false);
        config.prune_other_versions = file.clean_old_versions.unwrap_or(false);
        config.skip_supervisor_checks = file.skip_pm2_checks.unwrap_or(false);
        config.allow_prereleases = file.prereleases_allowed.unwrap_or(false);
        if let Some(org) = file.github_org {
            config.repository_org = org;
        }
        if let Some(repo) = file.github_repo {
            config.repository_name = repo;
        }
        if let Some(product) = file.product_name {
            config.product_name = product;
        }
        if let Some(base) = file.api_base_url {
            config.api_base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(secs) = file.download_timeout_secs {
            config.download_timeout = Duration::from_secs(secs);
        }
        if let Some(pm) = file.package_manager {
            config.package_manager = pm;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_release_folder_fails() {
        let result = InstallConfig::try_from(ConfigFile::default());
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_empty_release_folder_fails() {
        let file = ConfigFile {
            release_folder: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            InstallConfig::try_from(file),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_defaults_applied() {
        let file = ConfigFile {
            release_folder: Some("releases".to_string()),
            ..Default::default()
        };
        let config = InstallConfig::try_from(file).unwrap();

        assert_eq!(config.release_folder, PathBuf::from("releases"));
        assert_eq!(config.repository(), "octofarm/octofarm");
        assert_eq!(config.product_name, "octofarm");
        assert_eq!(config.package_manager, "npm");
        assert!(!config.overwrite_existing);
        assert!(!config.allow_prereleases);
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{
                "release_folder": "releases",
                "decompress_overwrite": true,
                "cleanup_downloaded_archive": true,
                "clean_old_versions": true,
                "skip_pm2_checks": true,
                "prereleases_allowed": false,
                "github_org": "acme",
                "github_repo": "farm"
            }"#,
        )
        .unwrap();

        let config = InstallConfig::try_from(ConfigFile::load(&path).unwrap()).unwrap();
        assert!(config.overwrite_existing);
        assert!(config.cleanup_archive_after_install);
        assert!(config.prune_other_versions);
        assert!(config.skip_supervisor_checks);
        assert_eq!(config.repository(), "acme/farm");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"release_folder": "r", "bogus": 1}"#).unwrap();

        assert!(matches!(ConfigFile::load(&path), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_missing_optional_file_is_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let file = ConfigFile::load_or_default(&path, false).unwrap();
        assert!(file.release_folder.is_none());
        assert!(ConfigFile::load_or_default(&path, true).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let base = ConfigFile {
            release_folder: Some("from-file".to_string()),
            decompress_overwrite: Some(false),
            github_org: Some("file-org".to_string()),
            ..Default::default()
        };
        let overrides = ConfigFile {
            decompress_overwrite: Some(true),
            github_org: Some("cli-org".to_string()),
            ..Default::default()
        };

        let merged = base.merge(overrides);
        assert_eq!(merged.release_folder.as_deref(), Some("from-file"));
        assert_eq!(merged.decompress_overwrite, Some(true));
        assert_eq!(merged.github_org.as_deref(), Some("cli-org"));
    }

    #[test]
    fn test_product_name_with_separator_rejected() {
        let file = ConfigFile {
            release_folder: Some("releases".to_string()),
            product_name: Some("../evil".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            InstallConfig::try_from(file),
            Err(Error::ConfigError(_))
        ));
    }
}
