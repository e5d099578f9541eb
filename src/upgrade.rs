// src/upgrade.rs

//! Upgrade orchestration
//!
//! Sequences one installer run:
//!
//! ```text
//! Preparing -> CheckingRemote -> ComparingLocal -> UpToDate -> Done
//!                                               -> Installing -> Finalizing -> Done
//! ```
//!
//! Any error moves the run to `Failed` with the step it happened in. Nothing
//! is rolled back: a partial download or extraction stays on disk and is
//! overwritten (or rejected) by the next run.

use crate::config::InstallConfig;
use crate::error::{Error, Result};
use crate::install::{self, MANIFEST_FILE};
use crate::lock::RunLock;
use crate::npm::PackageManager;
use crate::release::{self, ArtifactFetcher, Release, ReleaseSource};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Step of an installer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeState {
    /// Locking the release folder and checking the process supervisor
    Preparing,
    CheckingRemote,
    ComparingLocal,
    UpToDate,
    /// Downloading and extracting the release
    Installing,
    /// Patching the manifest, installing dependencies and pruning
    Finalizing,
    Done,
    Failed { step: &'static str, reason: String },
}

impl UpgradeState {
    /// Short name of the step
    pub fn label(&self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::CheckingRemote => "checking remote",
            Self::ComparingLocal => "comparing local",
            Self::UpToDate => "up to date",
            Self::Installing => "installing",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { step, reason } => write!(f, "failed while {}: {}", step, reason),
            other => f.write_str(other.label()),
        }
    }
}

/// Cooperative cancellation flag, checked between steps
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The latest release was already installed
    UpToDate { tag: String },
    /// The latest release was installed into `path`
    Installed {
        tag: String,
        path: PathBuf,
        pruned: Vec<PathBuf>,
    },
}

impl UpgradeOutcome {
    pub fn tag(&self) -> &str {
        match self {
            Self::UpToDate { tag } | Self::Installed { tag, .. } => tag,
        }
    }
}

/// Result of `check_for_update`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCheck {
    pub release: Release,
    pub installed: bool,
}

impl UpdateCheck {
    pub fn update_available(&self) -> bool {
        !self.installed
    }
}

/// Latest eligible release, with its tag checked for use in paths
fn latest_installable(config: &InstallConfig, source: &dyn ReleaseSource) -> Result<Release> {
    let release = source.latest(&config.repository(), config.allow_prereleases)?;
    install::validate_tag(&release.tag)?;
    info!("Latest release is {}", release.tag);
    Ok(release)
}

/// Report whether a newer release is available without installing it
///
/// Only reads the feed and the release folder; no lock is taken.
pub fn check_for_update(config: &InstallConfig, source: &dyn ReleaseSource) -> Result<UpdateCheck> {
    let release = latest_installable(config, source)?;
    let installed = install::is_installed(config, &release.tag)?;
    Ok(UpdateCheck { release, installed })
}

/// Drives one installer run against the given seams
pub struct Upgrader<'a> {
    config: &'a InstallConfig,
    source: &'a dyn ReleaseSource,
    fetcher: &'a dyn ArtifactFetcher,
    package_manager: &'a dyn PackageManager,
    cancel: CancellationToken,
    state: UpgradeState,
}

impl<'a> Upgrader<'a> {
    pub fn new(
        config: &'a InstallConfig,
        source: &'a dyn ReleaseSource,
        fetcher: &'a dyn ArtifactFetcher,
        package_manager: &'a dyn PackageManager,
    ) -> Self {
        Self {
            config,
            source,
            fetcher,
            package_manager,
            cancel: CancellationToken::new(),
            state: UpgradeState::Preparing,
        }
    }

    /// Use `token` to cancel the run between steps
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> &UpgradeState {
        &self.state
    }

    /// Install the latest release unless it is already installed
    pub fn run(&mut self) -> Result<UpgradeOutcome> {
        let result = self.run_inner();
        self.settle(result)
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.transition(UpgradeState::Done);
                Ok(value)
            }
            Err(e) => {
                self.state = UpgradeState::Failed {
                    step: self.state.label(),
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: UpgradeState) {
        debug!("Upgrade state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Fail with `Cancelled` if cancellation was requested before `step`
    fn checkpoint(&self, step: &'static str) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!("Cancellation requested, stopping before {}", step);
            return Err(Error::Cancelled(step));
        }
        Ok(())
    }

    fn latest_release(&mut self) -> Result<Release> {
        self.checkpoint("checking remote")?;
        self.transition(UpgradeState::CheckingRemote);
        latest_installable(self.config, self.source)
    }

    fn compare_local(&mut self, release: &Release) -> Result<bool> {
        self.checkpoint("comparing local")?;
        self.transition(UpgradeState::ComparingLocal);
        install::is_installed(self.config, &release.tag)
    }

    fn run_inner(&mut self) -> Result<UpgradeOutcome> {
        let config = self.config;

        self.checkpoint("preparing")?;
        self.transition(UpgradeState::Preparing);
        let _lock = RunLock::acquire(&config.release_folder)?;
        if config.skip_supervisor_checks {
            info!("Skipping process supervisor checks");
        } else {
            self.package_manager.ensure_supervisor()?;
        }

        let release = self.latest_release()?;
        let tag = release.tag.clone();
        if self.compare_local(&release)? {
            self.transition(UpgradeState::UpToDate);
            info!("Release {} is already installed", tag);
            return Ok(UpgradeOutcome::UpToDate { tag });
        }
        info!("Release {} is not installed yet", tag);

        self.checkpoint("installing")?;
        self.transition(UpgradeState::Installing);
        let url = release::select_download_url(&release)?;
        let packaged = release::is_packaged_asset(url);
        let archive = self.fetcher.fetch(url, &config.release_folder, &tag)?;

        self.checkpoint("extracting")?;
        let path = install::install_archive(config, &archive, &tag, packaged)?;
        if config.cleanup_archive_after_install {
            info!("Removing downloaded archive {}", archive.display());
            fs::remove_file(&archive).map_err(|e| {
                Error::IoError(format!("Failed to remove {}: {}", archive.display(), e))
            })?;
        }

        self.checkpoint("finalizing")?;
        self.transition(UpgradeState::Finalizing);
        install::patch_manifest(&tag, &path.join(MANIFEST_FILE))?;
        self.package_manager.install_dependencies(&path)?;
        let pruned = if config.prune_other_versions {
            install::prune_other_versions(&config.release_folder, &tag)?
        } else {
            Vec::new()
        };

        info!("Release {} installed at {}", tag, path.display());
        Ok(UpgradeOutcome::Installed { tag, path, pruned })
    }
}
