// src/install/manifest.rs

//! Release manifest (`package.json`) handling
//!
//! The manifest is kept as a generic JSON document with its key order
//! preserved, so that rewriting it after a patch changes nothing but the
//! patched key.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// File name of the manifest inside a release directory
pub const MANIFEST_FILE: &str = "package.json";

/// Dependency tables searched when removing a dependency, in order
const DEPENDENCY_SECTIONS: [&str; 3] = ["dependencies", "devDependencies", "optionalDependencies"];

/// Parsed release manifest
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    document: Map<String, Value>,
}

impl PackageManifest {
    /// Parse a manifest from JSON text
    pub fn parse(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| Error::ParseError(format!("Invalid manifest JSON: {}", e)))?;
        match value {
            Value::Object(document) => Ok(Self { document }),
            _ => Err(Error::ParseError(
                "Manifest must be a JSON object".to_string(),
            )),
        }
    }

    /// Load the manifest at `path`
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ManifestNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Declared version, if any
    pub fn version(&self) -> Option<&str> {
        self.document.get("version").and_then(Value::as_str)
    }

    /// Whether any dependency table declares `name`
    pub fn has_dependency(&self, name: &str) -> bool {
        DEPENDENCY_SECTIONS.iter().any(|section| {
            self.document
                .get(*section)
                .and_then(Value::as_object)
                .is_some_and(|deps| deps.contains_key(name))
        })
    }

    /// Remove the first declaration of `name`
    ///
    /// Tables are searched in `DEPENDENCY_SECTIONS` order and only the first
    /// match is removed. Returns the table it was removed from.
    pub fn remove_dependency(&mut self, name: &str) -> Option<&'static str> {
        for section in DEPENDENCY_SECTIONS {
            if let Some(deps) = self.document.get_mut(section).and_then(Value::as_object_mut) {
                if deps.shift_remove(name).is_some() {
                    return Some(section);
                }
            }
        }
        None
    }

    /// Serialize back to pretty-printed JSON with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut content = serde_json::to_string_pretty(&self.document)
            .map_err(|e| Error::ParseError(format!("Failed to serialize manifest: {}", e)))?;
        content.push('\n');
        Ok(content)
    }

    /// Write the manifest to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)
            .map_err(|e| Error::IoError(format!("Failed to write {}: {}", path.display(), e)))
    }
}
