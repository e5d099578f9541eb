// src/lib.rs

//! OctoFarm Installer
//!
//! Keeps a local OctoFarm deployment on the latest published release of its
//! GitHub repository.
//!
//! # Architecture
//!
//! - Filesystem-first: a release is installed when `<product>-<tag>/package.json`
//!   declares the tag as version; nothing else is recorded
//! - Seams: release feed, artifact fetcher and package manager are traits so
//!   the pipeline runs against fakes in tests
//! - One run at a time: an advisory lock guards the release folder
//! - No rollback: a failed run leaves its partial state for the next run to
//!   overwrite or reject

pub mod archive;
pub mod config;
mod error;
pub mod install;
pub mod lock;
pub mod npm;
pub mod progress;
pub mod release;
pub mod upgrade;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
