// src/release/mod.rs

//! Release feed access and artifact downloading
//!
//! This module provides functionality for:
//! - Reading the release feed of a repository
//! - Filtering drafts and prereleases
//! - Picking the download URL of a release (packaged asset or source archive)
//! - Streaming the chosen artifact to disk

pub mod client;
pub mod download;

pub use client::GithubReleaseClient;
pub use download::{ArtifactFetcher, HttpFetcher};

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// Host serving packaged release assets
const RELEASE_HOST: &str = "github.com";

/// Path fragment of release asset downloads (as opposed to source archives)
const RELEASE_DOWNLOAD_PATH: &str = "/releases/download/";

/// One published release as returned by the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    /// Version identifier, also used in directory names
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "draft", default)]
    pub is_draft: bool,
    #[serde(rename = "prerelease", default)]
    pub is_prerelease: bool,
    /// Source snapshot, used when the release has no assets
    #[serde(rename = "tarball_url", default)]
    pub source_archive_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Downloadable artifact attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    #[serde(default)]
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

impl Release {
    /// Whether the release may be installed under the given prerelease policy
    pub fn is_eligible(&self, include_prereleases: bool) -> bool {
        !self.is_draft && (!self.is_prerelease || include_prereleases)
    }
}

/// Source of release metadata for a repository
pub trait ReleaseSource {
    /// Fetch the unfiltered release list, newest first, for `org/repo`
    fn fetch_releases(&self, repository: &str) -> Result<Vec<Release>>;

    /// Eligible releases in feed order
    fn list_releases(&self, repository: &str, include_prereleases: bool) -> Result<Vec<Release>> {
        let releases = self.fetch_releases(repository)?;
        let total = releases.len();
        let eligible = filter_eligible(releases, include_prereleases);
        debug!(
            "{} of {} releases of {} are eligible",
            eligible.len(),
            total,
            repository
        );
        Ok(eligible)
    }

    /// The most recent eligible release
    ///
    /// Any feed failure is reported as `NoReleasesFound`.
    fn latest(&self, repository: &str, include_prereleases: bool) -> Result<Release> {
        match self.list_releases(repository, include_prereleases) {
            Ok(releases) => releases.into_iter().next().ok_or_else(|| {
                Error::NoReleasesFound(format!(
                    "Received an empty list of releases for {}. Are you sure the right repository was configured?",
                    repository
                ))
            }),
            Err(e @ Error::NoReleasesFound(_)) => Err(e),
            Err(e) => Err(Error::NoReleasesFound(format!(
                "Release feed for {} could not be read: {}",
                repository, e
            ))),
        }
    }
}

/// Keep only releases that are neither drafts nor disallowed prereleases,
/// preserving feed order
pub fn filter_eligible(releases: Vec<Release>, include_prereleases: bool) -> Vec<Release> {
    releases
        .into_iter()
        .filter(|r| r.is_eligible(include_prereleases))
        .collect()
}

/// Download URL of a release, without logging
///
/// The first asset wins, then the source archive.
pub fn download_url(release: &Release) -> Option<&str> {
    release
        .assets
        .first()
        .map(|a| a.browser_download_url.as_str())
        .or(release.source_archive_url.as_deref())
}

/// Preferred download URL of a release
///
/// Same choice as [`download_url`], but falling back to the source archive
/// is logged, as it may not match the published product.
pub fn select_download_url(release: &Release) -> Result<&str> {
    let url = download_url(release).ok_or_else(|| {
        Error::DownloadFailed(format!(
            "Release {} has neither assets nor a source archive",
            release.tag
        ))
    })?;

    if release.assets.is_empty() {
        warn!(
            "Release {} has no assets, downloading the source code instead. \
             Expect inconsistencies with the published product as its assets will most likely not be fully up-to-date",
            release.tag
        );
    }
    Ok(url)
}

/// Whether `url` points at a packaged release asset rather than a source
/// snapshot
pub fn is_packaged_asset(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            parsed.host_str() == Some(RELEASE_HOST) && parsed.path().contains(RELEASE_DOWNLOAD_PATH)
        }
        Err(_) => false,
    }
}
