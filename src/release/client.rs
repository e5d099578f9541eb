// src/release/client.rs

//! GitHub releases API client

use super::{Release, ReleaseSource};
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{info, warn};

/// Default timeout for metadata requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts for the metadata request
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// User agent sent with every request; the GitHub API rejects requests without one
pub(crate) const USER_AGENT: &str = concat!("octofarm-installer/", env!("CARGO_PKG_VERSION"));

/// Release feed client for the GitHub REST API
pub struct GithubReleaseClient {
    client: Client,
    api_base_url: String,
    max_retries: u32,
}

impl GithubReleaseClient {
    /// Create a client for the API rooted at `api_base_url`
    pub fn new(api_base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            max_retries: MAX_RETRIES,
        })
    }

    fn releases_url(&self, repository: &str) -> String {
        format!("{}/repos/{}/releases", self.api_base_url, repository)
    }
}

impl ReleaseSource for GithubReleaseClient {
    fn fetch_releases(&self, repository: &str) -> Result<Vec<Release>> {
        let url = self.releases_url(repository);
        info!("Fetching releases from {}", url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(&url).send() {
                Ok(response) => {
                    if !response.status().is_success() {
                        return Err(Error::NoReleasesFound(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }

                    let releases: Vec<Release> = response.json().map_err(|e| {
                        Error::ParseError(format!("Failed to parse release feed JSON: {}", e))
                    })?;

                    info!("Received {} releases for {}", releases.len(), repository);
                    return Ok(releases);
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::NoReleasesFound(format!(
                            "Failed to fetch {} after {} attempts: {}",
                            url, attempt, e
                        )));
                    }
                    warn!("Release feed attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}
