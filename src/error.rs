// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for the installer
#[derive(Error, Debug)]
pub enum Error {
    /// The release feed was empty after filtering, or could not be read
    #[error("No releases found: {0}")]
    NoReleasesFound(String),

    /// A release tag that cannot be used as part of a directory name
    #[error("Invalid release tag '{0}': tags must be non-empty and free of path separators")]
    InvalidReleaseTag(String),

    /// A release directory exists but its manifest is missing or unreadable
    #[error("Corrupt installation at {path}: {reason}")]
    CorruptInstallation { path: PathBuf, reason: String },

    /// Network, timeout or HTTP status failure while downloading an artifact
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// The archive does not have the layout the installer expects
    #[error("Unexpected archive layout: {0}")]
    UnexpectedArchiveLayout(String),

    /// The canonical release directory exists and overwriting is disabled
    #[error(
        "Target release folder {} already exists, set 'decompress_overwrite' to true or remove the folder",
        .0.display()
    )]
    TargetAlreadyExists(PathBuf),

    /// The release manifest could not be found
    #[error("Manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    /// The package manager failed to install dependencies
    #[error("Dependency installation failed: {0}")]
    DependencyInstallFailed(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed JSON or version strings
    #[error("Parse error: {0}")]
    ParseError(String),

    /// I/O errors with context
    #[error("I/O error: {0}")]
    IoError(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client initialization error
    #[error("Failed to initialize: {0}")]
    InitError(String),

    /// Another run holds the release folder lock
    #[error("Release folder is locked by another installer run: {}", .0.display())]
    LockHeld(PathBuf),

    /// The run was cancelled before the named step started
    #[error("Cancelled before {0}")]
    Cancelled(&'static str),
}

/// Result type alias using the installer's Error type
pub type Result<T> = std::result::Result<T, Error>;
