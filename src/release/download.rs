// src/release/download.rs

//! Artifact download
//!
//! The response body is streamed to `<product>-<tag>-download.zip` in the
//! destination directory in fixed-size chunks. A failed download leaves the
//! partial file where it is; the next run starts over from scratch.

use super::client::USER_AGENT;
use crate::config::InstallConfig;
use crate::error::{Error, Result};
use crate::install::artifact_file_name;
use crate::progress::DownloadProgress;
use reqwest::blocking::{Client, Response};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Timeout for establishing the connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Chunk size used when streaming the response to disk
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Downloads a release artifact to local disk
pub trait ArtifactFetcher {
    /// Fetch `url` into `destination_dir` and return the written file path
    fn fetch(&self, url: &str, destination_dir: &Path, tag: &str) -> Result<PathBuf>;
}

/// HTTP artifact fetcher
pub struct HttpFetcher {
    client: Client,
    product_name: String,
    show_progress: bool,
}

impl HttpFetcher {
    /// Create a fetcher using the product name and timeouts of `config`
    pub fn new(config: &InstallConfig, show_progress: bool) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.download_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            product_name: config.product_name.clone(),
            show_progress,
        })
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, destination_dir: &Path, tag: &str) -> Result<PathBuf> {
        let dest_path = destination_dir.join(artifact_file_name(&self.product_name, tag));
        info!("Downloading release from {} to {}", url, dest_path.display());

        fs::create_dir_all(destination_dir).map_err(|e| {
            Error::IoError(format!(
                "Failed to create directory {}: {}",
                destination_dir.display(),
                e
            ))
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::DownloadFailed(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::DownloadFailed(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let content_length = response.content_length();
        if content_length.is_none() {
            warn!("content-length was undefined, guessing download size");
        }

        let progress = DownloadProgress::new(tag, content_length, self.show_progress);

        let mut file = File::create(&dest_path).map_err(|e| {
            Error::IoError(format!("Failed to create file {}: {}", dest_path.display(), e))
        })?;

        match stream_response_to_file(response, &mut file, &progress) {
            Ok(_) => {
                progress.finish();
                info!("Downloaded {}", download_summary(&progress));
                Ok(dest_path)
            }
            Err(e) => {
                warn!("Download of {} stopped after {}", tag, download_summary(&progress));
                progress.abandon();
                Err(e)
            }
        }
    }
}

/// Bytes received, against the total when the server declared one
fn download_summary(progress: &DownloadProgress) -> String {
    if progress.is_estimated() {
        format!("{} bytes (size was not declared)", progress.position())
    } else {
        format!(
            "{} of {} bytes ({:.0}%)",
            progress.position(),
            progress.length(),
            progress.fraction() * 100.0
        )
    }
}

/// Copy the response body to `file`, advancing `progress` per chunk
fn stream_response_to_file(
    mut response: Response,
    file: &mut File,
    progress: &DownloadProgress,
) -> Result<u64> {
    let mut downloaded: u64 = 0;
    let mut buffer = vec![0u8; STREAM_BUFFER_SIZE];

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| Error::DownloadFailed(format!("Failed to read response: {}", e)))?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| Error::DownloadFailed(format!("Failed to write data: {}", e)))?;

        downloaded += bytes_read as u64;
        progress.advance(bytes_read as u64);
    }

    file.flush()
        .map_err(|e| Error::DownloadFailed(format!("Failed to flush download: {}", e)))?;

    Ok(downloaded)
}
