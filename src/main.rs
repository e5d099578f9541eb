// src/main.rs

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use octofarm_installer::config::{ConfigFile, DEFAULT_CONFIG_FILE, InstallConfig};
use octofarm_installer::npm::Npm;
use octofarm_installer::release::{self, GithubReleaseClient, HttpFetcher, ReleaseSource};
use octofarm_installer::upgrade::{UpgradeOutcome, UpgradeState, Upgrader, check_for_update};
use std::io;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "octofarm-installer")]
#[command(author, version, about = "Keeps an OctoFarm deployment on its latest release", long_about = None)]
struct Cli {
    /// Configuration file (default: ./octofarm-installer.config.json)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Hide the download progress bar
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Command-line overrides of configuration file values
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Folder holding one subdirectory per installed release
    #[arg(long, global = true, value_name = "PATH")]
    release_folder: Option<String>,

    /// Replace an existing folder of the release being installed
    #[arg(long, global = true, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    overwrite: Option<bool>,

    /// Delete the downloaded archive after extraction
    #[arg(long, global = true, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    cleanup_archive: Option<bool>,

    /// Delete all other release folders after a successful install
    #[arg(long, global = true, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    prune: Option<bool>,

    /// Do not check for (or install) pm2
    #[arg(long, global = true, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    skip_pm2_checks: Option<bool>,

    /// Consider prereleases when looking for the latest release
    #[arg(long, global = true, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    prereleases: Option<bool>,

    /// GitHub organization publishing the releases
    #[arg(long, global = true)]
    org: Option<String>,

    /// GitHub repository publishing the releases
    #[arg(long, global = true)]
    repo: Option<String>,
}

impl Overrides {
    fn into_config_file(self) -> ConfigFile {
        ConfigFile {
            release_folder: self.release_folder,
            decompress_overwrite: self.overwrite,
            cleanup_downloaded_archive: self.cleanup_archive,
            clean_old_versions: self.prune,
            skip_pm2_checks: self.skip_pm2_checks,
            prereleases_allowed: self.prereleases,
            github_org: self.org,
            github_repo: self.repo,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Install the latest release unless it is already installed (default)
    Upgrade,
    /// Report whether a newer release is available without installing it
    Check,
    /// List installable releases with their download URL
    Releases,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Load the configuration file and apply command-line overrides
fn load_config(path: Option<PathBuf>, overrides: Overrides) -> Result<InstallConfig> {
    let (path, required) = match path {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let file = ConfigFile::load_or_default(&path, required)?.merge(overrides.into_config_file());
    let config = InstallConfig::try_from(file)
        .with_context(|| format!("Invalid configuration (file: {})", path.display()))?;
    Ok(config)
}

fn cmd_upgrade(config: &InstallConfig, show_progress: bool) -> Result<()> {
    let client = GithubReleaseClient::new(&config.api_base_url)?;
    let fetcher = HttpFetcher::new(config, show_progress)?;
    let npm = Npm::new(config.package_manager.as_str());

    let mut upgrader = Upgrader::new(config, &client, &fetcher, &npm);
    let outcome = match upgrader.run() {
        Ok(outcome) => outcome,
        Err(e) => {
            let step = match upgrader.state() {
                UpgradeState::Failed { step, .. } => *step,
                other => other.label(),
            };
            return Err(anyhow::Error::new(e).context(format!("Upgrade failed while {}", step)));
        }
    };

    match outcome {
        UpgradeOutcome::UpToDate { tag } => {
            println!(
                "✓ The latest release of {} ({}) is already installed",
                config.repository(),
                tag
            );
        }
        UpgradeOutcome::Installed { tag, path, pruned } => {
            println!(
                "✓ The latest release of {} ({}) is installed in {}",
                config.repository(),
                tag,
                path.display()
            );
            for dir in pruned {
                println!("  Removed {}", dir.display());
            }
        }
    }
    Ok(())
}

fn cmd_check(config: &InstallConfig) -> Result<()> {
    let client = GithubReleaseClient::new(&config.api_base_url)?;
    let check = check_for_update(config, &client).context("Update check failed")?;

    if check.update_available() {
        println!(
            "Release {} of {} is available but not installed",
            check.release.tag,
            config.repository()
        );
    } else {
        println!(
            "✓ The latest release of {} ({}) is already installed",
            config.repository(),
            check.release.tag
        );
    }
    Ok(())
}

fn cmd_releases(config: &InstallConfig) -> Result<()> {
    let client = GithubReleaseClient::new(&config.api_base_url)?;
    let releases = client
        .list_releases(&config.repository(), config.allow_prereleases)
        .context("Failed to read the release feed")?;

    if releases.is_empty() {
        println!("No installable releases found for {}", config.repository());
        return Ok(());
    }

    println!("Releases of {}:", config.repository());
    for rel in releases {
        let published = rel
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let (url, kind) = match release::download_url(&rel) {
            Some(url) if release::is_packaged_asset(url) => (url, "asset"),
            Some(url) => (url, "source"),
            None => ("-", "none"),
        };
        let marker = if rel.is_prerelease { " (prerelease)" } else { "" };
        println!("  {}{}  {}  [{}] {}", rel.tag, marker, published, kind, url);
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Upgrade);

    if let Commands::Completions { shell } = command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "octofarm-installer", &mut io::stdout());
        return Ok(());
    }

    info!("OctoFarm installer v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config(cli.config, cli.overrides)?;

    match command {
        Commands::Upgrade => cmd_upgrade(&config, !cli.quiet),
        Commands::Check => cmd_check(&config),
        Commands::Releases => cmd_releases(&config),
        Commands::Completions { .. } => Ok(()),
    }
}
