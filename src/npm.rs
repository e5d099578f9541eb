// src/npm.rs

//! Package manager integration
//!
//! Installed releases are Node.js applications. Their production
//! dependencies are installed by running the configured package manager in
//! the release directory, and the pm2 process supervisor is installed
//! globally when missing.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Globally installed process supervisor
pub const SUPERVISOR_PACKAGE: &str = "pm2";

/// Operations the installer needs from a package manager
pub trait PackageManager {
    /// Install production dependencies of the release in `target_dir`
    fn install_dependencies(&self, target_dir: &Path) -> Result<()>;

    /// Make sure the process supervisor is installed globally
    fn ensure_supervisor(&self) -> Result<()>;
}

/// npm (or a compatible executable) driven as a subprocess
#[derive(Debug, Clone)]
pub struct Npm {
    program: String,
}

impl Npm {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate the executable on PATH
    fn resolve(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|e| {
            Error::DependencyInstallFailed(format!(
                "Package manager '{}' not found: {}",
                self.program, e
            ))
        })
    }

    /// Run with inherited stdio and fail on a non-zero exit
    fn run(&self, args: &[&str], current_dir: Option<&Path>) -> Result<()> {
        let program = self.resolve()?;
        let mut command = Command::new(&program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = current_dir {
            command.current_dir(dir);
        }

        debug!("Running {} {}", program.display(), args.join(" "));
        let status = command.status().map_err(|e| {
            Error::DependencyInstallFailed(format!(
                "Failed to run {} {}: {}",
                self.program,
                args.join(" "),
                e
            ))
        })?;

        if !status.success() {
            return Err(Error::DependencyInstallFailed(format!(
                "{} {} exited with {}",
                self.program,
                args.join(" "),
                status
            )));
        }
        Ok(())
    }

    /// Whether the supervisor shows up in the global package listing
    fn supervisor_installed(&self) -> bool {
        let program = match self.resolve() {
            Ok(program) => program,
            Err(e) => {
                warn!("{}", e);
                return false;
            }
        };

        match Command::new(program)
            .args(["list", "--depth=0", "-g", SUPERVISOR_PACKAGE])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => supervisor_listed(&String::from_utf8_lossy(&output.stdout)),
            Err(e) => {
                warn!("Could not list global packages: {}", e);
                false
            }
        }
    }
}

impl PackageManager for Npm {
    fn install_dependencies(&self, target_dir: &Path) -> Result<()> {
        info!(
            "Installing production dependencies in {}",
            target_dir.display()
        );
        self.run(&["ci", "--production"], Some(target_dir))?;
        info!("Dependencies installed");
        Ok(())
    }

    fn ensure_supervisor(&self) -> Result<()> {
        if self.supervisor_installed() {
            info!("{} is installed globally", SUPERVISOR_PACKAGE);
            return Ok(());
        }

        warn!(
            "{} was not found, installing it globally",
            SUPERVISOR_PACKAGE
        );
        self.run(&["install", "-g", SUPERVISOR_PACKAGE], None)
    }
}

/// Whether any line of a global package listing mentions the supervisor
pub fn supervisor_listed(listing: &str) -> bool {
    listing.lines().any(|line| line.contains(SUPERVISOR_PACKAGE))
}
